use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, parse_macro_input};

/// Derive macro for record shapes.
///
/// Implements `crud_api::Record` by registering every named field, in
/// declaration order, with the column it is tagged with:
///
/// - `#[crud(column = "...")]`: the field is populated from that column.
/// - `#[crud(column = "...", read_only)]`: declared but never written.
/// - no attribute: the field is never populated.
///
/// Tagged fields must implement `crud_api::FromValue`.
///
/// # Example
///
/// ```
/// use crud_api::{Record, Uuid};
///
/// #[derive(Record, Default)]
/// pub struct User {
///     #[crud(column = "id")]
///     pub id: Uuid,
///     #[crud(column = "fk")]
///     pub fk: Option<Uuid>,
///     pub cached: bool,
/// }
///
/// let shape = User::shape().unwrap();
/// assert_eq!(shape.field_for_column("fk").unwrap().1.name(), "fk");
/// ```
///
/// # Rejected shapes
///
/// Two fields tagged with the same column:
///
/// ```compile_fail
/// #[derive(crud_api::Record)]
/// struct Pair {
///     #[crud(column = "a")]
///     x: i32,
///     #[crud(column = "a")]
///     y: i32,
/// }
/// ```
///
/// Anything but a struct with named fields:
///
/// ```compile_fail
/// #[derive(crud_api::Record)]
/// enum Status {
///     Active,
/// }
/// ```
///
/// ```compile_fail
/// #[derive(crud_api::Record)]
/// struct Wrapper(i32);
/// ```
///
/// Generic structs:
///
/// ```compile_fail
/// #[derive(crud_api::Record)]
/// struct Cell<T> {
///     #[crud(column = "value")]
///     value: T,
/// }
/// ```
///
/// `read_only` without a column:
///
/// ```compile_fail
/// #[derive(crud_api::Record)]
/// struct Audit {
///     #[crud(read_only)]
///     created_by: String,
/// }
/// ```
#[proc_macro_derive(Record, attributes(crud))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for query inputs.
///
/// Implements `crud_api::Args`: named fields become arguments in
/// declaration order, which must match the query's placeholders.
/// `#[crud(skip)]` leaves a field out; `column` and `read_only` are rejected.
/// Fields must implement `crud_api::ToValue`.
///
/// ```
/// use crud_api::{Args, Value};
///
/// #[derive(Args)]
/// struct NewUser {
///     name: String,
///     age: i32,
///     #[crud(skip)]
///     trace_id: u64,
/// }
///
/// let user = NewUser { name: "Jane".into(), age: 41, trace_id: 9 };
/// assert_eq!(user.arguments(), vec![Value::from("Jane"), Value::Int64(41)]);
/// ```
///
/// ```compile_fail
/// #[derive(crud_api::Args)]
/// struct NewUser {
///     #[crud(column = "name")]
///     name: String,
/// }
/// ```
#[proc_macro_derive(Args, attributes(crud))]
pub fn derive_args(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match args_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Parsed `#[crud(...)]` attributes of one field.
#[derive(Default)]
struct FieldAttrs {
    column: Option<LitStr>,
    read_only: bool,
    skip: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Derive {
    Record,
    Args,
}

fn field_attrs(field: &Field, derive: Derive) -> Result<FieldAttrs, syn::Error> {
    let mut attrs = FieldAttrs::default();
    let mut read_only = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("crud") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if derive == Derive::Args {
                return Err(meta.error("Args fields only accept #[crud(skip)]"));
            } else if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("column tag must not be empty"));
                }
                attrs.column = Some(value);
            } else if meta.path.is_ident("read_only") {
                attrs.read_only = true;
                read_only = Some(meta.path.clone());
            } else {
                return Err(meta.error(
                    "unknown crud attribute (expected column, read_only or skip)",
                ));
            }
            Ok(())
        })?;
    }
    if let Some(path) = read_only
        && attrs.column.is_none()
    {
        return Err(syn::Error::new_spanned(
            path,
            "read_only needs a column tag: #[crud(column = \"..\", read_only)]",
        ));
    }
    Ok(attrs)
}

fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<impl Iterator<Item = &'a Field>, syn::Error> {
    let name = &input.ident;
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter()),
            _ => Err(syn::Error::new_spanned(
                name,
                format!("{derive} only supports structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(name, format!("{derive} only supports structs"))),
    }
}

fn field_ident(field: &Field) -> Result<&Ident, syn::Error> {
    field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))
}

fn record_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();

    // The shape lives in a `static`, which cannot depend on type parameters.
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record does not support generic structs",
        ));
    }

    let mut seen: Vec<(String, &Ident)> = Vec::new();
    let mut field_tokens = Vec::new();

    for field in named_fields(input, "Record")? {
        let field_name = field_ident(field)?;
        let field_name_str = field_name.to_string();
        let field_ty = &field.ty;
        let attrs = field_attrs(field, Derive::Record)?;

        let column = match attrs.column {
            Some(column) if !attrs.skip => column,
            _ => {
                let ty_str = quote!(#field_ty).to_string().replace(' ', "");
                field_tokens.push(quote! {
                    .untagged(#field_name_str, crud_api::schema::FieldType::opaque(#ty_str))
                });
                continue;
            }
        };

        let column_str = column.value();
        if let Some((_, first)) = seen.iter().find(|(c, _)| *c == column_str) {
            return Err(syn::Error::new_spanned(
                &column,
                format!("column '{column_str}' is already tagged on field '{first}'"),
            ));
        }
        seen.push((column_str, field_name));

        field_tokens.push(if attrs.read_only {
            quote! {
                .read_only::<#field_ty>(#field_name_str, #column)
            }
        } else {
            quote! {
                .column::<#field_ty, _>(
                    #field_name_str,
                    #column,
                    |record: &mut #name| &mut record.#field_name,
                )
            }
        });
    }

    let expanded = quote! {
        impl crud_api::schema::Record for #name {
            fn shape() -> ::core::result::Result<
                &'static crud_api::schema::Shape<Self>,
                crud_api::error::ShapeError,
            > {
                static SHAPE: ::std::sync::OnceLock<
                    ::core::result::Result<
                        crud_api::schema::Shape<#name>,
                        crud_api::error::ShapeError,
                    >,
                > = ::std::sync::OnceLock::new();
                crud_api::schema::Shape::cached(&SHAPE, || {
                    crud_api::schema::Shape::builder(#name_str)
                        #(#field_tokens)*
                        .build()
                })
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

fn args_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut arg_tokens = Vec::new();
    for field in named_fields(input, "Args")? {
        let field_name = field_ident(field)?;
        if field_attrs(field, Derive::Args)?.skip {
            continue;
        }
        arg_tokens.push(quote! {
            crud_api::value::ToValue::to_value(&self.#field_name)
        });
    }

    let expanded = quote! {
        impl #impl_generics crud_api::query::Args for #name #ty_generics #where_clause {
            fn arguments(&self) -> ::std::vec::Vec<crud_api::value::Value<'_>> {
                ::std::vec![#(#arg_tokens),*]
            }
        }
    };

    Ok(TokenStream::from(expanded))
}
