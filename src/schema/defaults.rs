//! Default schema document and the defaults applied by `create_table`.

use crate::entity::now_iso;
use crate::schema::types::*;

struct F(SchemaField);

impl F {
    fn new(name: &str, label: &str, kind: FieldKind, order: i64) -> Self {
        F(SchemaField {
            name: name.into(),
            label: label.into(),
            field_type: FieldType::new(kind),
            description: None,
            order,
            display_in_list: true,
            searchable: false,
            sortable: true,
            editable: true,
        })
    }

    fn required(mut self) -> Self {
        self.0.field_type.required = Some(true);
        self
    }

    fn unique(mut self) -> Self {
        self.0.field_type.unique = Some(true);
        self
    }

    fn min(mut self, min: f64) -> Self {
        self.0.field_type.validation.get_or_insert_with(Default::default).min = Some(min);
        self
    }

    fn one_of(mut self, values: &[&str]) -> Self {
        self.0.field_type.validation.get_or_insert_with(Default::default).allowed =
            Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    fn references(mut self, table: &str) -> Self {
        self.0.field_type.reference = Some(FieldReference {
            table: table.into(),
            field: "id".into(),
        });
        self
    }

    fn searchable(mut self) -> Self {
        self.0.searchable = true;
        self
    }

    fn hidden(mut self) -> Self {
        self.0.display_in_list = false;
        self.0.sortable = false;
        self
    }

    fn read_only(mut self) -> Self {
        self.0.editable = false;
        self
    }
}

/// `id` and `createdAt`, the fields every new table starts with.
pub fn default_fields() -> Vec<SchemaField> {
    vec![
        F::new("id", "ID", FieldKind::String, 0).required().unique().read_only().0,
        F::new("createdAt", "Created At", FieldKind::Datetime, 999).required().read_only().0,
    ]
}

fn table(
    name: &str,
    label: &str,
    description: &str,
    fields: Vec<F>,
    relationships: Vec<Relationship>,
    page_size: u32,
    now: &str,
) -> TableSchema {
    let mut display = DisplaySettings::default();
    display.list_view.page_size = Some(page_size);
    TableSchema {
        id: name.into(),
        name: name.into(),
        label: label.into(),
        description: description.into(),
        fields: fields.into_iter().map(|f| f.0).collect(),
        relationships,
        permissions: TablePermissions::default(),
        display_settings: display,
        hooks: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn belongs_to_material() -> Vec<Relationship> {
    vec![Relationship {
        kind: RelationshipKind::BelongsTo,
        table: "materials".into(),
        foreign_key: Some("materialId".into()),
        local_key: Some("id".into()),
    }]
}

pub fn default_schema() -> DatabaseSchema {
    let now = now_iso();
    let id = || F::new("id", "ID", FieldKind::String, 0).required().unique().read_only();
    DatabaseSchema {
        id: "default".into(),
        name: "Inventory ERP Schema".into(),
        version: "1.0.0".into(),
        tables: vec![
            table(
                "materials",
                "Materials",
                "Raw materials and components inventory",
                vec![
                    id(),
                    F::new("name", "Name", FieldKind::String, 1).required().searchable(),
                    F::new("description", "Description", FieldKind::Text, 2).searchable().hidden(),
                    F::new("quantity", "Quantity", FieldKind::Number, 3).required().min(0.0),
                    F::new("unit", "Unit", FieldKind::String, 4)
                        .required()
                        .one_of(&["kg", "lbs", "pieces", "liters"]),
                    F::new("cost", "Cost per Unit", FieldKind::Number, 5).required().min(0.0),
                    F::new("supplier", "Supplier", FieldKind::String, 6).searchable(),
                    F::new("createdAt", "Created At", FieldKind::Datetime, 7).required().read_only(),
                ],
                Vec::new(),
                10,
                &now,
            ),
            table(
                "batches",
                "Batches",
                "Production batches tracking",
                vec![
                    id(),
                    F::new("batchNumber", "Batch Number", FieldKind::String, 1)
                        .required()
                        .unique()
                        .searchable(),
                    F::new("materialId", "Material", FieldKind::Reference, 2)
                        .required()
                        .references("materials")
                        .searchable(),
                    F::new("quantity", "Quantity", FieldKind::Number, 3).required().min(0.0),
                    F::new("status", "Status", FieldKind::String, 4)
                        .required()
                        .one_of(&["pending", "in-progress", "completed", "cancelled"]),
                    F::new("createdAt", "Created At", FieldKind::Datetime, 5).required().read_only(),
                ],
                belongs_to_material(),
                10,
                &now,
            ),
            table(
                "transactions",
                "Transactions",
                "Inventory transactions log",
                vec![
                    id(),
                    F::new("type", "Type", FieldKind::String, 1)
                        .required()
                        .one_of(&["in", "out", "transfer", "adjustment"]),
                    F::new("materialId", "Material", FieldKind::Reference, 2)
                        .required()
                        .references("materials")
                        .searchable(),
                    F::new("quantity", "Quantity", FieldKind::Number, 3).required(),
                    F::new("description", "Description", FieldKind::Text, 4).searchable().hidden(),
                    F::new("createdAt", "Created At", FieldKind::Datetime, 5).required().read_only(),
                ],
                belongs_to_material(),
                15,
                &now,
            ),
        ],
        migrations: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_has_three_tables() {
        let s = default_schema();
        let ids: Vec<&str> = s.tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["materials", "batches", "transactions"]);
        assert_eq!(s.table("transactions").unwrap().display_settings.list_view.page_size, Some(15));
    }

    #[test]
    fn default_fields_are_id_and_created_at() {
        let f = default_fields();
        assert_eq!(f[0].name, "id");
        assert!(!f[0].editable);
        assert_eq!(f[1].name, "createdAt");
        assert_eq!(f[1].order, 999);
    }
}
