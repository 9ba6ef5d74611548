use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Fields, Ident, Path, Type,
};

#[proc_macro_derive(NestedSetModel, attributes(nested_set))]
pub fn derive_nested_set_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_nested_set_model(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct Options {
    id_field: Option<String>,
    id_type: Option<Type>,
    left_field: Option<String>,
    right_field: Option<String>,
    level_field: Option<String>,
    scope_field: Option<String>,
    entity_name: Option<String>,
    options: Option<Path>,
}

fn impl_nested_set_model(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_ident = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "NestedSetModel can only be derived for structs",
            ))
        }
    };

    let mut options = Options::default();
    let mut table_name: Option<String> = None;

    for attr in &input.attrs {
        if attr.path().is_ident("nested_set") {
            parse_nested_set_attr(attr, &mut options)?;
        }

        if attr.path().is_ident("sea_orm") {
            if let Some(name) = parse_sea_orm_table_name(attr)? {
                table_name = Some(name);
            }
        }
    }

    let id_field_name = options.id_field.unwrap_or_else(|| "id".to_string());
    let left_field_name = options
        .left_field
        .unwrap_or_else(|| "tree_left".to_string());
    let right_field_name = options
        .right_field
        .unwrap_or_else(|| "tree_right".to_string());
    let level_field_name = options
        .level_field
        .unwrap_or_else(|| "tree_level".to_string());
    let scope_field_name = options.scope_field;

    let id_field_ident = Ident::new(&id_field_name, struct_ident.span());
    let left_field_ident = Ident::new(&left_field_name, struct_ident.span());
    let right_field_ident = Ident::new(&right_field_name, struct_ident.span());
    let level_field_ident = Ident::new(&level_field_name, struct_ident.span());

    let mut id_field_type: Option<Type> = options.id_type.clone();
    let mut scope_field_type: Option<Type> = None;

    if let Fields::Named(ref fields) = data_struct.fields {
        for field in &fields.named {
            if let Some(ident) = &field.ident {
                if ident == &id_field_ident && id_field_type.is_none() {
                    id_field_type = Some(field.ty.clone());
                }
                if scope_field_name.as_deref() == Some(ident.unraw().to_string().as_str()) {
                    scope_field_type = Some(field.ty.clone());
                }
            }
        }
    } else {
        return Err(syn::Error::new(
            data_struct.fields.span(),
            "NestedSetModel requires named fields",
        ));
    }

    let id_type = id_field_type.ok_or_else(|| {
        syn::Error::new(
            struct_ident.span(),
            "Unable to determine id field type; specify `id_type = ...` in #[nested_set]",
        )
    })?;

    let entity_name = options
        .entity_name
        .unwrap_or_else(|| struct_ident.unraw().to_string());
    let base_table = table_name.unwrap_or_else(|| struct_ident.unraw().to_string());

    let id_column_variant = format_ident!("{}", to_pascal_case(&id_field_name));
    let left_column_variant = format_ident!("{}", to_pascal_case(&left_field_name));
    let right_column_variant = format_ident!("{}", to_pascal_case(&right_field_name));
    let level_column_variant = format_ident!("{}", to_pascal_case(&level_field_name));

    let entity_name_literal = syn::LitStr::new(&entity_name, struct_ident.span());
    let table_literal = syn::LitStr::new(&base_table, struct_ident.span());
    let user_options = match options.options {
        Some(path) => quote! { #path() },
        None => quote! { ::nested_set::NestedSetOptions::default() },
    };

    let scope_tokens = match scope_field_name {
        Some(scope_field_name) => {
            let scope_type = scope_field_type.ok_or_else(|| {
                syn::Error::new(
                    struct_ident.span(),
                    format!("`scope_field = \"{scope_field_name}\"` does not name a field"),
                )
            })?;
            let scope_field_ident = Ident::new(&scope_field_name, struct_ident.span());
            let scope_column_variant = format_ident!("{}", to_pascal_case(&scope_field_name));

            ScopeTokens {
                scope_type: quote! { #scope_type },
                methods: quote! {
                    fn scope(&self) -> Option<Self::Scope> {
                        Some(self.#scope_field_ident.clone())
                    }

                    fn scope_to_value(scope: &Self::Scope) -> ::sea_orm::Value {
                        ::sea_orm::Value::from(scope.clone())
                    }

                    fn set_scope(active: &mut Self::ActiveModel, scope: Self::Scope) {
                        active.#scope_field_ident = ::sea_orm::ActiveValue::Set(scope);
                    }

                    fn scope_column() -> Option<<Self::Entity as ::sea_orm::EntityTrait>::Column> {
                        Some(Column::#scope_column_variant)
                    }
                },
            }
        }
        None => ScopeTokens {
            scope_type: quote! { ::nested_set::Unscoped },
            methods: quote! {
                fn scope(&self) -> Option<Self::Scope> {
                    None
                }

                fn scope_to_value(scope: &Self::Scope) -> ::sea_orm::Value {
                    match *scope {}
                }

                fn set_scope(_active: &mut Self::ActiveModel, scope: Self::Scope) {
                    match scope {}
                }

                fn scope_column() -> Option<<Self::Entity as ::sea_orm::EntityTrait>::Column> {
                    None
                }
            },
        },
    };

    let ScopeTokens {
        scope_type,
        methods: scope_methods,
    } = scope_tokens;

    let generated = quote! {
        impl ::nested_set::NestedSetModel for #struct_ident {
            type Entity = Entity;
            type ActiveModel = ActiveModel;
            type Id = #id_type;
            type Scope = #scope_type;

            fn nested_set_config() -> &'static ::nested_set::NestedSetConfig {
                static CONFIG: ::once_cell::sync::Lazy<::nested_set::NestedSetConfig> =
                    ::once_cell::sync::Lazy::new(|| {
                        let base = ::nested_set::NestedSetConfig::new(
                            #entity_name_literal,
                            #table_literal,
                        );
                        let options: ::nested_set::NestedSetOptions = #user_options;
                        options.apply(base)
                    });
                &CONFIG
            }

            fn id(&self) -> Self::Id {
                self.#id_field_ident.clone()
            }

            fn id_to_value(id: &Self::Id) -> ::sea_orm::Value {
                ::sea_orm::Value::from(id.clone())
            }

            fn left(&self) -> i32 {
                self.#left_field_ident
            }

            fn right(&self) -> i32 {
                self.#right_field_ident
            }

            fn level(&self) -> i32 {
                self.#level_field_ident
            }

            fn set_left(active: &mut Self::ActiveModel, value: i32) {
                active.#left_field_ident = ::sea_orm::ActiveValue::Set(value);
            }

            fn set_right(active: &mut Self::ActiveModel, value: i32) {
                active.#right_field_ident = ::sea_orm::ActiveValue::Set(value);
            }

            fn set_level(active: &mut Self::ActiveModel, value: i32) {
                active.#level_field_ident = ::sea_orm::ActiveValue::Set(value);
            }

            fn id_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#id_column_variant
            }

            fn left_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#left_column_variant
            }

            fn right_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#right_column_variant
            }

            fn level_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#level_column_variant
            }

            #scope_methods
        }
    };

    Ok(generated.into())
}

struct ScopeTokens {
    scope_type: proc_macro2::TokenStream,
    methods: proc_macro2::TokenStream,
}

fn parse_nested_set_attr(attr: &Attribute, options: &mut Options) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        let ident = meta
            .path
            .get_ident()
            .ok_or_else(|| syn::Error::new(meta.path.span(), "Invalid option key"))?
            .to_string();

        match ident.as_str() {
            "id_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.id_field = Some(value.value());
            }
            "left_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.left_field = Some(value.value());
            }
            "right_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.right_field = Some(value.value());
            }
            "level_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.level_field = Some(value.value());
            }
            "scope_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.scope_field = Some(value.value());
            }
            "entity_name" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.entity_name = Some(value.value());
            }
            "options" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.options = Some(value.parse()?);
            }
            "id_type" => {
                let ty: Type = meta.value()?.parse()?;
                options.id_type = Some(ty);
            }
            other => {
                return Err(syn::Error::new(
                    meta.path.span(),
                    format!("Unsupported nested_set option `{other}`"),
                ));
            }
        }

        Ok(())
    })
}

fn parse_sea_orm_table_name(attr: &Attribute) -> syn::Result<Option<String>> {
    let mut table_name: Option<String> = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("table_name") {
            let value: syn::LitStr = meta.value()?.parse()?;
            table_name = Some(value.value());
        } else if meta.input.peek(syn::Token![=]) {
            let _: syn::Expr = meta.value()?.parse()?;
        }
        Ok(())
    })?;
    Ok(table_name)
}

fn to_pascal_case(value: &str) -> String {
    value
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
