//! Name derivation shared by the schema registry, the generator and theme CSS.

/// Table id from a free-form name: lowercase, whitespace runs become `_`.
/// e.g. "Purchase Orders" -> "purchase_orders"
pub fn table_slug(name: &str) -> String {
    join_words(name, '_')
}

/// Module id from a display name: lowercase, whitespace runs become `-`.
/// e.g. "Quality Checks" -> "quality-checks"
pub fn module_slug(name: &str) -> String {
    join_words(name, '-')
}

fn join_words(name: &str, sep: char) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if pending_sep {
            out.push(sep);
            pending_sep = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Drops one trailing `s`. Used for permission and button names of generated modules.
/// e.g. "batches" -> "batche", "materials" -> "material"
pub fn strip_plural(name: &str) -> &str {
    name.strip_suffix('s').unwrap_or(name)
}

/// Removes all whitespace. e.g. "Quality Checks" -> "QualityChecks"
pub fn squash(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace()).collect()
}

/// camelCase to kebab-case. e.g. "mutedForeground" -> "muted-foreground"
pub fn to_kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_uppercase() {
            out.push('-');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(table_slug("Purchase  Orders"), "purchase_orders");
        assert_eq!(table_slug(" Suppliers "), "suppliers");
        assert_eq!(module_slug("Quality Checks"), "quality-checks");
    }

    #[test]
    fn plural_and_squash() {
        assert_eq!(strip_plural("materials"), "material");
        assert_eq!(strip_plural("inventory"), "inventory");
        assert_eq!(squash("Purchase Orders"), "PurchaseOrders");
    }

    #[test]
    fn kebab() {
        assert_eq!(to_kebab_case("mutedForeground"), "muted-foreground");
        assert_eq!(to_kebab_case("primary"), "primary");
    }
}
