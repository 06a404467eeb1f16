//! Procedural macros used in the definition and implementation of getters and setters for the
//! keyed side-channel data carried by a CertificationRequest

use quote::quote;
use syn::parse::ParseStream;
use syn::parse::{Parse, Result};
use syn::{Expr, Ident, Token};

type ValueName = Ident;
type ValueType = Ident;
type DefaultValue = Expr;

/// Signature contains the results of parsing a req_gets_and_sets definition, i.e., the
/// name of a value stored in a RequestData map and the corresponding type.
struct Signature {
    value_name: ValueName,
    value_type: ValueType,
}

/// Syntax contains the components of a req_gets_and_sets, i.e., a value name, a comma and
/// a value type. For example:
///     ```text
///     req_gets_and_sets!(RQ_SOURCE_ID, String);
///     ```
struct Syntax {
    value_name: ValueName,
    _comma_token: Token!(,),
    value_type: ValueType,
}

/// is_string_numeric is used to determine if a string value contains only numeric characters.
/// It is used to process a slice that omits the first character, i.e., in order to identify
/// types like u8, u32, etc.
fn is_string_numeric(str: &str) -> bool {
    for c in str.chars() {
        if !c.is_numeric() {
            return false;
        }
    }
    true
}

/// Maps a value type to the name of the RequestDataTypes variant that carries it, i.e., u64
/// becomes U64, bool becomes Bool and everything else is used verbatim.
fn variant_name(value_type: &Ident) -> String {
    let type_str = format!("{}", value_type);
    if type_str == "bool" {
        return "Bool".to_string();
    }
    if type_str.len() > 1 && is_string_numeric(&type_str[1..]) {
        type_str.to_uppercase()
    } else {
        type_str
    }
}

/// Strips the three character key prefix (i.e., RQ_) from a key constant and lowercases the rest
/// to form the accessor suffix.
fn accessor_suffix(value_name: &Ident) -> String {
    let name = format!("{}", value_name);
    match name.get(3..) {
        Some(s) => s.to_lowercase(),
        None => name.to_lowercase(),
    }
}

impl Parse for Signature {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        if stream.is_empty() {
            return Err(stream.error("expected a key constant and a value type"));
        }

        let syntax = Syntax {
            value_name: stream.parse()?,
            _comma_token: stream.parse()?,
            value_type: stream.parse()?,
        };

        Ok(Signature {
            value_name: syntax.value_name,
            value_type: syntax.value_type,
        })
    }
}

/// Generates `get_<key>` (returning `Option<T>`) and `set_<key>` methods on `CertificationRequest`
/// for a key stored in its `RequestData` map.
#[proc_macro]
pub fn req_gets_and_sets(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    let flag = signature.value_name;
    let return_t = signature.value_type;

    let flag_str = accessor_suffix(&flag);
    let getter_str = format!("get_{}", flag_str);
    let setter_str = format!("set_{}", flag_str);
    let getter = syn::Ident::new(&getter_str, flag.span());
    let setter = syn::Ident::new(&setter_str, flag.span());
    let req_type = syn::Ident::new(&variant_name(&return_t), return_t.span());

    let getter_comment = format!(
        "`{}` is used to retrieve the `{}` item from a [`CertificationRequest`] instance",
        getter_str, flag
    );
    let setter_comment = format!(
        "`{}` is used to set the `{}` item in a [`CertificationRequest`] instance",
        setter_str, flag
    );

    let tokens = quote! {
        impl CertificationRequest {
            #[doc = #getter_comment]
            pub fn #getter(&self) -> Option<#return_t> {
                match self.extended_data.0.get(#flag) {
                    Some(RequestDataTypes::#req_type(v)) => Some(v.clone()),
                    _ => None,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(&mut self, v: #return_t) {
                self.extended_data.0.insert(
                    #flag.to_string(),
                    RequestDataTypes::#req_type(v),
                );
            }
        }
    };
    tokens.into()
}

/// SignatureWithDefault contains the results of parsing a req_gets_and_sets_with_default definition, i.e., the
/// name of a value stored in a RequestData map, the corresponding type and the default value.
struct SignatureWithDefault {
    value_name: ValueName,
    value_type: ValueType,
    default_value: DefaultValue,
}

/// Syntax contains the components of a req_gets_and_sets_with_default, i.e., a value name, a comma,
/// a value type, a comma and a default value expression. For example:
///     ```text
///     req_gets_and_sets_with_default!(RQ_CERT_TYPE, String, "client".to_string());
///     ```
struct SyntaxWithDefault {
    value_name: ValueName,
    _comma_token: Token!(,),
    value_type: ValueType,
    _comma_token2: Token!(,),
    default_value: DefaultValue,
}

impl Parse for SignatureWithDefault {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        if stream.is_empty() {
            return Err(stream.error("expected a key constant, a value type and a default value"));
        }

        let syntax = SyntaxWithDefault {
            value_name: stream.parse()?,
            _comma_token: stream.parse()?,
            value_type: stream.parse()?,
            _comma_token2: stream.parse()?,
            default_value: stream.parse()?,
        };

        Ok(SignatureWithDefault {
            value_name: syntax.value_name,
            value_type: syntax.value_type,
            default_value: syntax.default_value,
        })
    }
}

/// Generates `get_<key>` (returning `T`, falling back to the default expression) and `set_<key>`
/// methods on `CertificationRequest` for a key stored in its `RequestData` map.
#[proc_macro]
pub fn req_gets_and_sets_with_default(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as SignatureWithDefault);
    let flag = signature.value_name;
    let return_t = signature.value_type;
    let default_value = signature.default_value;

    let flag_str = accessor_suffix(&flag);
    let getter_str = format!("get_{}", flag_str);
    let setter_str = format!("set_{}", flag_str);
    let getter = syn::Ident::new(&getter_str, flag.span());
    let setter = syn::Ident::new(&setter_str, flag.span());
    let req_type = syn::Ident::new(&variant_name(&return_t), return_t.span());

    let getter_comment = format!(
        "`{}` is used to retrieve the `{}` item from a [`CertificationRequest`] instance",
        getter_str, flag
    );
    let setter_comment = format!(
        "`{}` is used to set the `{}` item in a [`CertificationRequest`] instance",
        setter_str, flag
    );

    let tokens = quote! {
        impl CertificationRequest {
            #[doc = #getter_comment]
            pub fn #getter(&self) -> #return_t {
                match self.extended_data.0.get(#flag) {
                    Some(RequestDataTypes::#req_type(v)) => v.clone(),
                    _ => #default_value,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(&mut self, v: #return_t) {
                self.extended_data.0.insert(
                    #flag.to_string(),
                    RequestDataTypes::#req_type(v),
                );
            }
        }
    };
    tokens.into()
}
