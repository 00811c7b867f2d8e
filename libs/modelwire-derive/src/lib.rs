use std::collections::HashMap;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitInt, LitStr, parse_macro_input};

/// Derive macro for record types.
///
/// Generates `Record`, `FieldType` and `OptionalField` impls, so the type can
/// be encoded on its own and nested inside other records (directly, as
/// `Option<T>`, or inside lists and maps).
///
/// The struct must implement `Default`. Defaults of the declared fields
/// become the descriptor defaults.
///
/// # Example
///
/// ```ignore
/// #[derive(Model, Default)]
/// #[model(name = "Person")]
/// pub struct Person {
///     #[model(identity)]
///     pub identity: Identity,
///
///     #[field(id = 1)]
///     pub name: String,
///
///     #[field(id = 2, name = "years")]
///     pub age: i64,
///
///     // no #[field]: not serialized
///     pub scratch: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model, field))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_model_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for closed enumerations of unit variants.
///
/// Members travel by name. The default name is the variant name in
/// snake_case; `#[member(name = "...")]` overrides it.
///
/// ```ignore
/// #[derive(Enumeration, Clone, Copy)]
/// #[enumeration(name = "Color")]
/// pub enum Color {
///     Red,
///     #[member(name = "GREEN")]
///     Green,
/// }
/// ```
#[proc_macro_derive(Enumeration, attributes(enumeration, member))]
pub fn derive_enumeration(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_enumeration_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

struct ModelField {
    ident: syn::Ident,
    ty: syn::Type,
    name: String,
    id: u16,
}

fn derive_model_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model does not support generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Model only supports structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(ident, "Model only supports structs")),
    };

    let mut type_name = ident.to_string();
    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                type_name = value.value();
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }

    let mut declared: Vec<ModelField> = Vec::new();
    let mut identity: Option<syn::Ident> = None;
    let mut seen_ids: HashMap<u16, String> = HashMap::new();

    for field in fields {
        let field_ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;

        let mut is_identity = false;
        let mut id: Option<u16> = None;
        let mut name: Option<String> = None;

        for attr in &field.attrs {
            if attr.path().is_ident("model") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("identity") {
                        is_identity = true;
                        Ok(())
                    } else {
                        Err(meta.error("expected `identity`"))
                    }
                })?;
            } else if attr.path().is_ident("field") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("id") {
                        let value: LitInt = meta.value()?.parse()?;
                        id = Some(value.base10_parse()?);
                    } else if meta.path.is_ident("name") {
                        let value: LitStr = meta.value()?.parse()?;
                        name = Some(value.value());
                    } else {
                        return Err(meta.error("expected `id = N` or `name = \"...\"`"));
                    }
                    Ok(())
                })?;
            }
        }

        if is_identity {
            if id.is_some() {
                return Err(syn::Error::new_spanned(
                    &field_ident,
                    "identity field cannot also carry #[field(...)]",
                ));
            }
            if identity.replace(field_ident.clone()).is_some() {
                return Err(syn::Error::new_spanned(
                    &field_ident,
                    "only one #[model(identity)] field is allowed",
                ));
            }
            continue;
        }

        let Some(id) = id else {
            if name.is_some() {
                return Err(syn::Error::new_spanned(
                    &field_ident,
                    "missing #[field(id = N)]",
                ));
            }
            continue;
        };

        let name = name.unwrap_or_else(|| field_ident.to_string());
        if let Some(previous) = seen_ids.insert(id, name.clone()) {
            return Err(syn::Error::new_spanned(
                &field_ident,
                format!("field id {id} already used by '{previous}'"),
            ));
        }
        declared.push(ModelField {
            ident: field_ident,
            ty: field.ty.clone(),
            name,
            id,
        });
    }

    let descriptor_fields = declared.iter().map(|f| {
        let (field_ident, ty, name, id) = (&f.ident, &f.ty, &f.name, f.id);
        quote! {
            .with_field(
                modelwire_api::schema::FieldDescriptor::new(
                    #name,
                    #id,
                    <#ty as modelwire_api::record::FieldType>::logical_type(),
                )
                .with_default(<#ty as modelwire_api::record::FieldType>::to_value(&__defaults.#field_ident))
            )
        }
    });

    let getters = declared.iter().map(|f| {
        let (field_ident, ty, name) = (&f.ident, &f.ty, &f.name);
        quote! {
            #name => ::core::option::Option::Some(
                <#ty as modelwire_api::record::FieldType>::to_value(&self.#field_ident)
            ),
        }
    });

    let setters = declared.iter().map(|f| {
        let (field_ident, ty, name) = (&f.ident, &f.ty, &f.name);
        quote! {
            #name => {
                self.#field_ident = <#ty as modelwire_api::record::FieldType>::from_value(__value)
                    .map_err(|e| e.with_context(::core::concat!(#type_name, ".", #name)))?;
                ::core::result::Result::Ok(())
            }
        }
    });

    let (identity_get, identity_set, identity_ref) = match &identity {
        Some(id_ident) => (
            quote! { self.#id_ident.get_value(__other) },
            quote! {
                if modelwire_api::schema::IDENTITY_FIELDS.contains(&__other) {
                    self.#id_ident.set_value(__other, __value)
                } else {
                    ::core::result::Result::Ok(())
                }
            },
            quote! {
                fn identity(&self) -> ::core::option::Option<&modelwire_api::record::Identity> {
                    ::core::option::Option::Some(&self.#id_ident)
                }
            },
        ),
        None => (
            quote! {{
                let _ = __other;
                ::core::option::Option::None
            }},
            quote! {{
                let _ = (__other, __value);
                ::core::result::Result::Ok(())
            }},
            quote! {},
        ),
    };

    Ok(quote! {
        impl modelwire_api::record::Record for #ident {
            fn descriptor() -> ::std::sync::Arc<modelwire_api::schema::TypeDescriptor> {
                static DESCRIPTOR: ::std::sync::OnceLock<::std::sync::Arc<modelwire_api::schema::TypeDescriptor>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR
                    .get_or_init(|| {
                        let __defaults = <Self as ::core::default::Default>::default();
                        ::std::sync::Arc::new(
                            modelwire_api::schema::TypeDescriptor::new(#type_name)
                                #(#descriptor_fields)*
                        )
                    })
                    .clone()
            }

            fn get_field(&self, __name: &str) -> ::core::option::Option<modelwire_api::value::Value> {
                match __name {
                    #(#getters)*
                    __other => #identity_get,
                }
            }

            fn set_field(
                &mut self,
                __name: &str,
                __value: modelwire_api::value::Value,
            ) -> ::core::result::Result<(), modelwire_api::error::CodecError> {
                match __name {
                    #(#setters)*
                    __other => #identity_set,
                }
            }

            #identity_ref
        }

        impl modelwire_api::record::FieldType for #ident {
            fn logical_type() -> modelwire_api::schema::LogicalType {
                modelwire_api::schema::LogicalType::Object(
                    <Self as modelwire_api::record::Record>::descriptor(),
                )
            }

            fn to_value(&self) -> modelwire_api::value::Value {
                modelwire_api::record::model_to_value(self)
            }

            fn from_value(
                value: modelwire_api::value::Value,
            ) -> ::core::result::Result<Self, modelwire_api::error::CodecError> {
                modelwire_api::record::model_from_value(value)
            }
        }

        impl modelwire_api::record::OptionalField for #ident {
            fn logical_type() -> modelwire_api::schema::LogicalType {
                <Self as modelwire_api::record::FieldType>::logical_type()
            }

            fn to_value(&self) -> modelwire_api::value::Value {
                modelwire_api::record::model_to_value(self)
            }

            fn from_value(
                value: modelwire_api::value::Value,
            ) -> ::core::result::Result<Self, modelwire_api::error::CodecError> {
                modelwire_api::record::model_from_value(value)
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

fn derive_enumeration_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let ident = &input.ident;
    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => return Err(syn::Error::new_spanned(ident, "Enumeration only supports enums")),
    };

    let mut enum_name = ident.to_string();
    for attr in &input.attrs {
        if !attr.path().is_ident("enumeration") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                enum_name = value.value();
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }

    let mut idents = Vec::new();
    let mut names: Vec<String> = Vec::new();
    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Enumeration variants must be unit variants",
            ));
        }
        let mut name = snake_case(&variant.ident.to_string());
        for attr in &variant.attrs {
            if !attr.path().is_ident("member") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    name = value.value();
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"`"))
                }
            })?;
        }
        if name.is_empty() {
            return Err(syn::Error::new_spanned(variant, "member name cannot be empty"));
        }
        if names.contains(&name) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("member name '{name}' is used twice"),
            ));
        }
        idents.push(variant.ident.clone());
        names.push(name);
    }

    let to_name = idents.iter().zip(&names).map(|(v, n)| quote! { Self::#v => #n, });
    let from_name = idents
        .iter()
        .zip(&names)
        .map(|(v, n)| quote! { #n => ::core::option::Option::Some(Self::#v), });

    Ok(quote! {
        impl modelwire_api::enumeration::Enumeration for #ident {
            fn registry() -> ::std::sync::Arc<modelwire_api::enumeration::EnumRegistry> {
                static REGISTRY: ::std::sync::OnceLock<::std::sync::Arc<modelwire_api::enumeration::EnumRegistry>> =
                    ::std::sync::OnceLock::new();
                REGISTRY
                    .get_or_init(|| modelwire_api::enumeration::EnumRegistry::sealed(#enum_name, &[#(#names),*]))
                    .clone()
            }

            fn name(&self) -> &'static str {
                match self {
                    #(#to_name)*
                }
            }

            fn from_name(name: &str) -> ::core::option::Option<Self> {
                match name {
                    #(#from_name)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl modelwire_api::record::FieldType for #ident {
            fn logical_type() -> modelwire_api::schema::LogicalType {
                modelwire_api::schema::LogicalType::Enumeration(
                    <Self as modelwire_api::enumeration::Enumeration>::registry(),
                )
            }

            fn to_value(&self) -> modelwire_api::value::Value {
                modelwire_api::record::enum_to_value(self)
            }

            fn from_value(
                value: modelwire_api::value::Value,
            ) -> ::core::result::Result<Self, modelwire_api::error::CodecError> {
                modelwire_api::record::enum_from_value(value)
            }
        }

        impl modelwire_api::record::OptionalField for #ident {
            fn logical_type() -> modelwire_api::schema::LogicalType {
                <Self as modelwire_api::record::FieldType>::logical_type()
            }

            fn to_value(&self) -> modelwire_api::value::Value {
                modelwire_api::record::enum_to_value(self)
            }

            fn from_value(
                value: modelwire_api::value::Value,
            ) -> ::core::result::Result<Self, modelwire_api::error::CodecError> {
                modelwire_api::record::enum_from_value(value)
            }
        }
    })
}

/// `ExtraLarge` -> `extra_large`, `XL` -> `xl`.
fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev_lower = false;
    for c in ident.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}
