//! Built-in themes, custom theme derivation and the CSS custom-property projection.

use crate::naming::to_kebab_case;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub font_size: BTreeMap<String, String>,
    pub font_weight: BTreeMap<String, u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// camelCase color names to CSS color values.
    pub colors: BTreeMap<String, String>,
    pub typography: Typography,
    pub spacing: BTreeMap<String, String>,
    pub border_radius: BTreeMap<String, String>,
    pub shadows: BTreeMap<String, String>,
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyOverrides {
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: BTreeMap<String, String>,
    #[serde(default)]
    pub font_weight: BTreeMap<String, u16>,
}

/// Partial theme applied over a base theme.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeOverrides {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    pub typography: Option<TypographyOverrides>,
    #[serde(default)]
    pub spacing: BTreeMap<String, String>,
    #[serde(default)]
    pub border_radius: BTreeMap<String, String>,
    #[serde(default)]
    pub shadows: BTreeMap<String, String>,
    pub dark_mode: Option<bool>,
}

fn strings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

const FONT_FAMILY: &str = r#"Inter, -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif"#;
const INK: &str = "hsl(222.2 84% 4.9%)";
const WHITE: &str = "hsl(0 0% 100%)";
const RED: &str = "hsl(0 84.2% 60.2%)";
const SNOW: &str = "hsl(210 40% 98%)";

/// Palette entries that differ between the built-in themes.
struct Palette {
    primary: &'static str,
    secondary: &'static str,
    accent: &'static str,
    background: &'static str,
    foreground: &'static str,
    muted_foreground: &'static str,
    border: &'static str,
    success: &'static str,
    warning: &'static str,
    info: &'static str,
}

fn theme(id: &str, name: &str, description: &str, p: Palette, dark_mode: bool) -> ThemeConfig {
    let colors = strings(&[
        ("primary", p.primary),
        ("secondary", p.secondary),
        ("accent", p.accent),
        ("background", p.background),
        ("foreground", p.foreground),
        ("muted", p.secondary),
        ("mutedForeground", p.muted_foreground),
        ("card", p.background),
        ("cardForeground", p.foreground),
        ("popover", p.background),
        ("popoverForeground", p.foreground),
        ("border", p.border),
        ("input", p.border),
        ("ring", p.primary),
        ("destructive", RED),
        ("destructiveForeground", SNOW),
        ("success", p.success),
        ("warning", p.warning),
        ("info", p.info),
    ]);
    ThemeConfig {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        colors,
        typography: Typography {
            font_family: FONT_FAMILY.into(),
            font_size: strings(&[
                ("xs", "0.75rem"),
                ("sm", "0.875rem"),
                ("base", "1rem"),
                ("lg", "1.125rem"),
                ("xl", "1.25rem"),
                ("2xl", "1.5rem"),
                ("3xl", "1.875rem"),
                ("4xl", "2.25rem"),
            ]),
            font_weight: [("light", 300), ("normal", 400), ("medium", 500), ("semibold", 600), ("bold", 700)]
                .into_iter()
                .map(|(k, w)| (k.to_string(), w))
                .collect(),
        },
        spacing: strings(&[("xs", "0.5rem"), ("sm", "1rem"), ("md", "1.5rem"), ("lg", "2rem"), ("xl", "3rem")]),
        border_radius: strings(&[("sm", "0.375rem"), ("md", "0.5rem"), ("lg", "0.75rem"), ("xl", "1rem")]),
        shadows: strings(&[
            ("sm", "0 1px 2px 0 rgb(0 0 0 / 0.05)"),
            ("md", "0 4px 6px -1px rgb(0 0 0 / 0.1), 0 2px 4px -2px rgb(0 0 0 / 0.1)"),
            ("lg", "0 10px 15px -3px rgb(0 0 0 / 0.1), 0 4px 6px -4px rgb(0 0 0 / 0.1)"),
            ("xl", "0 20px 25px -5px rgb(0 0 0 / 0.1), 0 8px 10px -6px rgb(0 0 0 / 0.1)"),
        ]),
        dark_mode,
    }
}

pub fn default_themes() -> Vec<ThemeConfig> {
    vec![
        theme(
            "default",
            "Default",
            "Clean and modern default theme",
            Palette {
                primary: "hsl(221.2 83.2% 53.3%)",
                secondary: "hsl(210 40% 96%)",
                accent: "hsl(210 40% 96%)",
                background: WHITE,
                foreground: INK,
                muted_foreground: "hsl(215.4 16.3% 46.9%)",
                border: "hsl(214.3 31.8% 91.4%)",
                success: "hsl(142.1 76.2% 36.3%)",
                warning: "hsl(38.1 91.8% 60.2%)",
                info: "hsl(199.8 95.5% 73.9%)",
            },
            false,
        ),
        theme(
            "dark",
            "Dark",
            "Sleek dark theme for low-light environments",
            Palette {
                primary: "hsl(213 92% 67%)",
                secondary: "hsl(217.2 32.6% 17.5%)",
                accent: "hsl(217.2 32.6% 17.5%)",
                background: INK,
                foreground: SNOW,
                muted_foreground: "hsl(215 20.2% 65.1%)",
                border: "hsl(217.2 32.6% 17.5%)",
                success: "hsl(142.1 76.2% 36.3%)",
                warning: "hsl(38.1 91.8% 60.2%)",
                info: "hsl(199.8 95.5% 73.9%)",
            },
            true,
        ),
        theme(
            "ocean",
            "Ocean",
            "Calming blue and teal color scheme",
            Palette {
                primary: "hsl(191 91% 36%)",
                secondary: "hsl(191 85% 96%)",
                accent: "hsl(172 66% 50%)",
                background: WHITE,
                foreground: INK,
                muted_foreground: "hsl(191 16% 47%)",
                border: "hsl(191 31% 91%)",
                success: "hsl(160 84% 39%)",
                warning: "hsl(42 96% 59%)",
                info: "hsl(191 91% 36%)",
            },
            false,
        ),
        theme(
            "forest",
            "Forest",
            "Natural green theme inspired by nature",
            Palette {
                primary: "hsl(134 61% 41%)",
                secondary: "hsl(134 40% 96%)",
                accent: "hsl(45 93% 47%)",
                background: WHITE,
                foreground: INK,
                muted_foreground: "hsl(134 16% 47%)",
                border: "hsl(134 31% 91%)",
                success: "hsl(134 61% 41%)",
                warning: "hsl(45 93% 47%)",
                info: "hsl(205 78% 60%)",
            },
            false,
        ),
        theme(
            "sunset",
            "Sunset",
            "Warm orange and purple gradient theme",
            Palette {
                primary: "hsl(21 90% 48%)",
                secondary: "hsl(21 85% 96%)",
                accent: "hsl(270 70% 55%)",
                background: WHITE,
                foreground: INK,
                muted_foreground: "hsl(21 16% 47%)",
                border: "hsl(21 31% 91%)",
                success: "hsl(134 61% 41%)",
                warning: "hsl(21 90% 48%)",
                info: "hsl(270 70% 55%)",
            },
            false,
        ),
    ]
}

/// Base theme with overrides merged key by key.
pub fn create_custom_theme(base: &ThemeConfig, overrides: ThemeOverrides) -> ThemeConfig {
    let mut t = base.clone();
    if let Some(id) = overrides.id {
        t.id = id;
    }
    if let Some(name) = overrides.name {
        t.name = name;
    }
    if let Some(description) = overrides.description {
        t.description = description;
    }
    if let Some(dark) = overrides.dark_mode {
        t.dark_mode = dark;
    }
    t.colors.extend(overrides.colors);
    if let Some(ty) = overrides.typography {
        if let Some(family) = ty.font_family {
            t.typography.font_family = family;
        }
        t.typography.font_size.extend(ty.font_size);
        t.typography.font_weight.extend(ty.font_weight);
    }
    t.spacing.extend(overrides.spacing);
    t.border_radius.extend(overrides.border_radius);
    t.shadows.extend(overrides.shadows);
    t
}

/// `:root` block of CSS custom properties; dark themes add a `.dark` block.
pub fn theme_css(theme: &ThemeConfig) -> String {
    let mut css = String::from(":root {\n");
    // Writing to a String cannot fail.
    for (k, v) in &theme.colors {
        let _ = writeln!(css, "  --{}: {};", to_kebab_case(k), v);
    }
    let _ = writeln!(css, "  --font-family: {};", theme.typography.font_family);
    for (k, v) in &theme.typography.font_size {
        let _ = writeln!(css, "  --font-size-{}: {};", k, v);
    }
    for (k, v) in &theme.typography.font_weight {
        let _ = writeln!(css, "  --font-weight-{}: {};", k, v);
    }
    for (prefix, values) in [("spacing", &theme.spacing), ("radius", &theme.border_radius), ("shadow", &theme.shadows)] {
        for (k, v) in values {
            let _ = writeln!(css, "  --{}-{}: {};", prefix, k, v);
        }
    }
    css.push_str("}\n");
    if theme.dark_mode {
        css.push_str("\n.dark {\n  color-scheme: dark;\n}\n");
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn five_builtin_themes() {
        let ids: Vec<String> = default_themes().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["default", "dark", "ocean", "forest", "sunset"]);
    }

    #[test]
    fn css_has_kebab_vars_and_dark_block() {
        let themes = default_themes();
        let css = theme_css(&themes[0]);
        assert!(css.starts_with(":root {\n"));
        assert!(css.contains("  --muted-foreground: hsl(215.4 16.3% 46.9%);\n"));
        assert!(css.contains("  --font-size-2xl: 1.5rem;\n"));
        assert!(css.contains("  --font-weight-bold: 700;\n"));
        assert!(css.contains("  --radius-md: 0.5rem;\n"));
        assert!(!css.contains(".dark"));
        assert!(theme_css(&themes[1]).ends_with("\n.dark {\n  color-scheme: dark;\n}\n"));
    }

    #[test]
    fn custom_theme_merges_over_base() {
        let base = &default_themes()[0];
        let overrides: ThemeOverrides = serde_json::from_value(json!({
            "id": "brand",
            "name": "Brand",
            "colors": {"primary": "hsl(330 81% 60%)"},
            "typography": {"fontSize": {"base": "15px"}},
            "darkMode": true
        }))
        .unwrap();
        let t = create_custom_theme(base, overrides);
        assert_eq!(t.id, "brand");
        assert_eq!(t.colors["primary"], "hsl(330 81% 60%)");
        assert_eq!(t.colors["secondary"], base.colors["secondary"]);
        assert_eq!(t.typography.font_size["base"], "15px");
        assert_eq!(t.typography.font_size["xs"], "0.75rem");
        assert!(t.dark_mode);
    }
}
