use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, FieldsNamed, Ident, Type, Variant};

/// What the expansion needs to know about one variant.
struct VariantSpec<'a> {
    ident: &'a Ident,
    source: Option<&'a Field>,
    has_context: bool,
    cfg_attrs: Vec<Attribute>,
}

impl VariantSpec<'_> {
    fn source_ty(&self) -> Option<&Type> {
        self.source.map(|field| &field.ty)
    }

    fn source_ident(&self) -> Option<&Ident> {
        self.source.and_then(|field| field.ident.as_ref())
    }

    fn is_internal(&self) -> bool {
        self.ident == "Internal"
    }
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    let ext_trait = format_ident!("{}Ext", name);

    let Data::Enum(data) = &input.data else {
        return quote! { compile_error!("feast_error can only be applied to enums"); };
    };

    let specs = match data.variants.iter().map(inspect_variant).collect::<Result<Vec<_>, _>>() {
        Ok(specs) => specs,
        Err(err) => return err.to_compile_error(),
    };
    if let Err(err) = require_context_for_sources(&specs) {
        return err.to_compile_error();
    }

    let derives = missing_derives(&input);
    let ext_impl = expand_ext_trait(name, &ext_trait, &specs);
    let from_impls = specs.iter().filter_map(|spec| expand_from_source(name, &ext_trait, spec));
    let internal_impls = expand_internal_conversions(name, &specs);
    let kind_impl = expand_kind(name, &specs);

    quote! {
        #[allow(non_shorthand_field_patterns)]
        #derives
        #input

        #ext_impl
        #(#from_impls)*
        #internal_impls
        #kind_impl

        #[allow(dead_code)]
        fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> std::borrow::Cow<'static, str> {
            context.as_ref().map_or(std::borrow::Cow::Borrowed(""), |c| std::borrow::Cow::Owned(format!(" ({c})")))
        }
    }
}

fn inspect_variant(variant: &Variant) -> Result<VariantSpec<'_>, syn::Error> {
    let Fields::Named(fields) = &variant.fields else {
        return Err(syn::Error::new_spanned(
            variant,
            "feast_error requires named fields so source/context can be wired",
        ));
    };

    let has_context = context_field(fields)?.is_some();
    let cfg_attrs =
        variant.attrs.iter().filter(|attr| attr.path().is_ident("cfg")).cloned().collect();

    Ok(VariantSpec { ident: &variant.ident, source: source_field(fields), has_context, cfg_attrs })
}

fn context_field(fields: &FieldsNamed) -> Result<Option<&Field>, syn::Error> {
    let Some(field) = fields.named.iter().find(|f| f.ident.as_ref().is_some_and(|i| i == "context"))
    else {
        return Ok(None);
    };

    if is_optional_static_cow_str(&field.ty) {
        Ok(Some(field))
    } else {
        Err(syn::Error::new_spanned(&field.ty, "context field must be Option<Cow<'static, str>>"))
    }
}

fn source_field(fields: &FieldsNamed) -> Option<&Field> {
    fields.named.iter().find(|field| {
        field.ident.as_ref().is_some_and(|ident| ident == "source")
            || field.attrs.iter().any(|a| a.path().is_ident("source") || a.path().is_ident("from"))
    })
}

fn require_context_for_sources(specs: &[VariantSpec<'_>]) -> Result<(), syn::Error> {
    specs.iter().find(|spec| spec.source.is_some() && !spec.has_context).map_or(Ok(()), |spec| {
        Err(syn::Error::new_spanned(
            spec.ident,
            "feast_error requires `context: Option<Cow<'static, str>>` next to a source field",
        ))
    })
}

fn missing_derives(input: &DeriveInput) -> TokenStream {
    let present = derived_traits(&input.attrs);
    let mut tokens = Vec::new();
    if !present.contains("Debug") {
        tokens.push(quote! { Debug });
    }
    if !present.contains("Error") {
        tokens.push(quote! { ::thiserror::Error });
    }
    if tokens.is_empty() { quote! {} } else { quote! { #[derive(#(#tokens),*)] } }
}

fn expand_ext_trait(name: &Ident, ext_trait: &Ident, specs: &[VariantSpec<'_>]) -> TokenStream {
    let arms = specs.iter().filter(|spec| spec.has_context).map(|spec| {
        let cfg_attrs = &spec.cfg_attrs;
        let ident = spec.ident;
        quote! { #(#cfg_attrs)* #name::#ident { context: c, .. } => *c = Some(context.into()), }
    });

    quote! {
        pub trait #ext_trait<T> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext_trait<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut e| {
                    match &mut e {
                        #( #arms )*
                        _ => {}
                    }
                    e
                })
            }
        }
    }
}

fn expand_from_source(
    name: &Ident,
    ext_trait: &Ident,
    spec: &VariantSpec<'_>,
) -> Option<TokenStream> {
    if spec.is_internal() {
        return None;
    }
    let source_ty = spec.source_ty()?;
    let source_ident = spec.source_ident()?;
    let ident = spec.ident;
    let cfg_attrs = &spec.cfg_attrs;

    Some(quote! {
        #(#cfg_attrs)*
        #[automatically_derived]
        impl From<#source_ty> for #name {
            #[inline]
            fn from(#source_ident: #source_ty) -> Self { Self::#ident { #source_ident, context: None } }
        }

        #(#cfg_attrs)*
        impl<T> #ext_trait<T> for std::result::Result<T, #source_ty> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> std::result::Result<T, #name> {
                self.map_err(|#source_ident| #name::#ident { #source_ident, context: Some(context.into()) })
            }
        }
    })
}

fn expand_internal_conversions(name: &Ident, specs: &[VariantSpec<'_>]) -> TokenStream {
    let Some(internal) = specs.iter().find(|spec| spec.is_internal()) else {
        return quote!();
    };
    let cfg_attrs = &internal.cfg_attrs;

    quote! {
        #(#cfg_attrs)*
        impl From<&'static str> for #name {
            #[inline]
            fn from(s: &'static str) -> Self { Self::Internal { message: std::borrow::Cow::Borrowed(s), context: None } }
        }
        #(#cfg_attrs)*
        impl From<String> for #name {
            #[inline]
            fn from(s: String) -> Self { Self::Internal { message: std::borrow::Cow::Owned(s), context: None } }
        }
    }
}

fn expand_kind(name: &Ident, specs: &[VariantSpec<'_>]) -> TokenStream {
    let arms = specs.iter().map(|spec| {
        let cfg_attrs = &spec.cfg_attrs;
        let ident = spec.ident;
        let label = ident.to_string();
        quote! { #(#cfg_attrs)* Self::#ident { .. } => #label, }
    });

    quote! {
        #[automatically_derived]
        impl #name {
            /// Name of the variant, suitable for structured log fields.
            #[must_use]
            pub const fn kind(&self) -> &'static str {
                match self {
                    #( #arms )*
                }
            }
        }
    }
}

fn derived_traits(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(segment) = meta.path.segments.last() {
                traits.insert(segment.ident.to_string());
            }
            Ok(())
        });
    }

    traits
}

/// Matches `Option<Cow<'static, str>>`, with or without path prefixes.
fn is_optional_static_cow_str(ty: &Type) -> bool {
    let Some(inner) = single_generic_type(ty, "Option") else {
        return false;
    };
    let Type::Path(path) = inner else {
        return false;
    };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    if segment.ident != "Cow" {
        return false;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };
    let mut args = args.args.iter();
    let static_lifetime =
        matches!(args.next(), Some(syn::GenericArgument::Lifetime(lt)) if lt.ident == "static");
    let str_type = matches!(
        args.next(),
        Some(syn::GenericArgument::Type(Type::Path(p)))
            if p.path.segments.last().is_some_and(|s| s.ident == "str")
    );
    static_lifetime && str_type
}

fn single_generic_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(src: &str) -> String {
        let input: DeriveInput = syn::parse_str(src).unwrap();
        expand_derive(input).to_string()
    }

    #[test]
    fn generates_ext_trait_and_kind() {
        let out = expand(
            r#"
            pub enum DemoError {
                #[error("io{}: {source}", format_context(.context))]
                Io { source: std::io::Error, context: Option<Cow<'static, str>> },
                #[error("internal{}: {message}", format_context(.context))]
                Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
            }
            "#,
        );

        assert!(out.contains("pub trait DemoErrorExt"));
        assert!(out.contains("impl From < std :: io :: Error > for DemoError"));
        assert!(out.contains("impl From < & 'static str > for DemoError"));
        assert!(out.contains("pub const fn kind"));
        assert!(out.contains("\"Io\""));
    }

    #[test]
    fn rejects_tuple_variants() {
        let out = expand(
            r#"
            pub enum DemoError {
                #[error("io: {0}")]
                Io(std::io::Error),
            }
            "#,
        );
        assert!(out.contains("compile_error"));
    }

    #[test]
    fn rejects_source_without_context() {
        let out = expand(
            r#"
            pub enum DemoError {
                #[error("io: {source}")]
                Io { source: std::io::Error },
            }
            "#,
        );
        assert!(out.contains("compile_error"));
    }

    #[test]
    fn rejects_wrong_context_type() {
        let out = expand(
            r#"
            pub enum DemoError {
                #[error("x")]
                Bad { message: String, context: Option<String> },
            }
            "#,
        );
        assert!(out.contains("compile_error"));
    }

    #[test]
    fn existing_derives_are_not_duplicated() {
        let out = expand(
            r#"
            #[derive(Debug)]
            pub enum DemoError {
                #[error("x{}: {message}", format_context(.context))]
                Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
            }
            "#,
        );
        assert_eq!(out.matches("Debug").count(), 1);
    }

    #[test]
    fn rejects_non_enum() {
        let out = expand("pub struct NotAnEnum { a: u8 }");
        assert!(out.contains("can only be applied to enums"));
    }
}
