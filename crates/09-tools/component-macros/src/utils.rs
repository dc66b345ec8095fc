//! 宏工具函数

use proc_macro2::Span;
use syn::{Data, DeriveInput, Field, Fields, GenericArgument, Ident, LitStr, PathArguments, Result, Type};

/// 取出结构体的具名字段，单元结构体没有字段
pub fn named_fields(input: &DeriveInput) -> Result<Vec<&Field>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            Fields::Unit => Ok(Vec::new()),
            Fields::Unnamed(_) => Err(syn::Error::new_spanned(
                &input.ident,
                "Injectable 只支持具名字段的结构体",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "Injectable 只能用于结构体",
        )),
    }
}

/// 若类型形如 `Wrapper<T>`，返回 `T`
pub fn wrapped_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// 生成字符串字面量
pub fn string_lit(value: &str, span: Span) -> LitStr {
    LitStr::new(value, span)
}

/// 生成自动注册函数名
pub fn registration_fn_name(struct_name: &Ident) -> Ident {
    Ident::new(
        &format!(
            "__register_injectable_{}",
            to_snake_case(&struct_name.to_string())
        ),
        Span::call_site(),
    )
}

/// 将驼峰命名转换为蛇形命名
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            // 检查前一个字符是否为小写，或者下一个字符是否为小写
            let prev_is_lower = chars.get(i - 1).map_or(false, |c| c.is_lowercase());
            let next_is_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());

            if prev_is_lower || next_is_lower {
                result.push('_');
            }
        }
        result.push(ch.to_lowercase().next().unwrap_or(ch));
    }

    result
}
