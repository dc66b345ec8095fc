//! `#[derive(Injectable)]` 实现

use crate::utils::{named_fields, registration_fn_name, string_lit, wrapped_type};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, Field, Ident, LitStr, Result, Type};

/// 组件级参数：`#[injectable(...)]`
#[derive(Debug, Default)]
pub struct InjectableArgs {
    /// 显式标识符
    pub id: Option<LitStr>,
    /// 是否为原型生命周期
    pub prototype: bool,
    /// 是否在程序启动时注册到全局注册表
    pub auto_register: bool,
}

impl InjectableArgs {
    /// 从结构体属性解析
    pub fn from_attrs(input: &DeriveInput) -> Result<Self> {
        let mut args = Self::default();
        for attr in &input.attrs {
            if !attr.path().is_ident("injectable") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    args.id = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("prototype") {
                    args.prototype = true;
                } else if meta.path.is_ident("singleton") {
                    args.prototype = false;
                } else if meta.path.is_ident("auto_register") {
                    args.auto_register = true;
                } else {
                    return Err(meta.error("未知的 injectable 参数"));
                }
                Ok(())
            })?;
        }
        Ok(args)
    }
}

/// 字段的注入方式
#[derive(Debug)]
pub enum FieldRole {
    /// 构造参数，按字段顺序编号
    Param {
        /// 显式标识符，缺省时由字段类型推导
        id: Option<LitStr>,
    },
    /// 构造后注入的属性
    Property {
        /// 注入的依赖，缺省为字段名
        id: LitStr,
        /// 静态默认值
        default: Option<Expr>,
    },
}

impl FieldRole {
    /// 从字段属性解析
    pub fn from_field(field: &Field, name: &Ident) -> Result<Self> {
        let mut id: Option<LitStr> = None;
        let mut property = false;
        let mut default: Option<Expr> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("inject") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    id = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("property") {
                    property = true;
                } else if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("未知的 inject 参数"));
                }
                Ok(())
            })?;
        }

        if property {
            Ok(Self::Property {
                id: id.unwrap_or_else(|| string_lit(&name.to_string(), name.span())),
                default,
            })
        } else if default.is_some() {
            Err(syn::Error::new_spanned(field, "default 只能用于 property 字段"))
        } else {
            Ok(Self::Param { id })
        }
    }
}

/// 生成 `Injectable` 实现
pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Injectable 不支持泛型结构体",
        ));
    }
    let fields = named_fields(input)?;
    let args = InjectableArgs::from_attrs(input)?;
    let struct_name = &input.ident;

    let mut initializers = Vec::new();
    let mut declarations = Vec::new();
    let mut position = 0usize;

    for field in fields {
        let Some(name) = field.ident.as_ref() else {
            continue;
        };
        match FieldRole::from_field(field, name)? {
            FieldRole::Param { id } => {
                let (init, declare) = param_tokens(&field.ty, position, id.as_ref());
                initializers.push(quote! { #name: #init });
                declarations.push(declare);
                position += 1;
            }
            FieldRole::Property { id, default } => {
                let (init, declare) = property_tokens(&field.ty, name, &id, default.as_ref());
                initializers.push(quote! { #name: #init });
                declarations.push(declare);
            }
        }
    }

    let id_call = args.id.as_ref().map(|id| quote! { .id(#id) });
    let lifecycle_call = if args.prototype {
        quote! { .prototype() }
    } else {
        quote! { .singleton() }
    };

    let registration = args.auto_register.then(|| {
        let fn_name = registration_fn_name(struct_name);
        let display_name = struct_name.to_string();
        quote! {
            // 使用 ctor 在程序启动时自动注册组件
            #[ctor::ctor]
            fn #fn_name() {
                let registry = ::di_abstractions::global_registry();
                if let Err(e) = <#struct_name as ::di_abstractions::Injectable>::declare(&registry) {
                    eprintln!("Failed to register component {}: {}", #display_name, e);
                }
            }
        }
    });

    Ok(quote! {
        impl ::di_abstractions::Injectable for #struct_name {
            fn builder() -> ::di_abstractions::DescriptorBuilder<Self> {
                ::di_abstractions::DescriptorBuilder::<Self>::constructor(
                    |args: &::di_abstractions::Arguments| {
                        ::core::result::Result::Ok(Self {
                            #(#initializers,)*
                        })
                    },
                )
                #id_call
                #lifecycle_call
                #(#declarations)*
            }
        }

        #registration
    })
}

/// 构造参数：`Arc<T>` 字段直接共享依赖，其余字段取克隆值
fn param_tokens(ty: &Type, position: usize, id: Option<&LitStr>) -> (TokenStream, TokenStream) {
    let (init, declared) = match wrapped_type(ty, "Arc") {
        Some(inner) => (quote! { args.get::<#inner>(#position)? }, inner),
        None => (quote! { args.cloned::<#ty>(#position)? }, ty),
    };
    let declare = match id {
        Some(id) => quote! { .param_id(#id) },
        None => quote! { .param::<#declared>() },
    };
    (init, declare)
}

/// 属性注入：`Option<_>` 字段初始为 `None`，其余字段初始为默认值
fn property_tokens(
    ty: &Type,
    name: &Ident,
    id: &LitStr,
    default: Option<&Expr>,
) -> (TokenStream, TokenStream) {
    let slot = name.to_string();
    let optional = wrapped_type(ty, "Option");
    let value_ty = optional.unwrap_or(ty);

    let (injected, assign) = match wrapped_type(value_ty, "Arc") {
        Some(inner) => (inner, quote! { value }),
        None => (value_ty, quote! { (*value).clone() }),
    };
    let (init, assign) = match optional {
        Some(_) => (
            quote! { ::core::option::Option::None },
            quote! { ::core::option::Option::Some(#assign) },
        ),
        None => (quote! { ::core::default::Default::default() }, assign),
    };

    let setter = quote! {
        |target: &mut Self, value: ::std::sync::Arc<#injected>| {
            target.#name = #assign;
        }
    };
    let declare = match default {
        Some(default) => quote! {
            .property_with_default::<#injected, _>(#slot, #id, #default, #setter)
        },
        None => quote! { .property::<#injected, _>(#slot, #id, #setter) },
    };
    (init, declare)
}
