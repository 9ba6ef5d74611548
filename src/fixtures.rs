//! Entities shared by the unit tests.

use crate::config::NestedSetOptions;

/// Options of the `menu` fixture, read the way an application would read them
/// from its settings.
pub fn menu_options() -> NestedSetOptions {
    serde_json::from_str(r#"{ "advisory_lock_strategy": "disabled" }"#)
        .expect("menu options are valid JSON")
}

pub mod category {
    use nested_set_macros::NestedSetModel;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
    #[sea_orm(table_name = "categories")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        pub tree_left: i32,
        pub tree_right: i32,
        pub tree_level: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    pub fn node(id: i32, left: i32, right: i32, level: i32) -> Model {
        Model {
            id,
            name: format!("n{id}"),
            tree_left: left,
            tree_right: right,
            tree_level: level,
        }
    }
}

pub mod menu {
    use nested_set_macros::NestedSetModel;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
    #[sea_orm(table_name = "menus")]
    #[nested_set(
        scope_field = "menu_id",
        level_field = "depth",
        options = "crate::fixtures::menu_options"
    )]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub menu_id: i32,
        pub tree_left: i32,
        pub tree_right: i32,
        pub depth: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    pub fn node(id: i32, menu_id: i32, left: i32, right: i32, depth: i32) -> Model {
        Model {
            id,
            menu_id,
            tree_left: left,
            tree_right: right,
            depth,
        }
    }
}
