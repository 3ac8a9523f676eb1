use std::borrow::Cow;

use heck::ToTitleCase;

use crate::config::CaseStyle;

/// Upper-cases the first character and lower-cases the remainder, borrowing
/// the input when it is already in that form.
pub fn capitalize(input: &str) -> Cow<'_, str> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Cow::Borrowed(input);
    };
    let rest = chars.as_str();
    let already = first.to_uppercase().eq(std::iter::once(first))
        && rest.chars().all(|ch| !ch.is_uppercase());
    if already {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len());
    output.extend(first.to_uppercase());
    output.push_str(&rest.to_lowercase());
    Cow::Owned(output)
}

/// Capitalizes every word; word boundaries follow `heck`.
pub fn title_case(input: &str) -> Cow<'_, str> {
    let converted = input.to_title_case();
    if converted == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(converted)
    }
}

pub fn apply_case(input: &str, style: CaseStyle) -> Cow<'_, str> {
    match style {
        CaseStyle::Capitalize => capitalize(input),
        CaseStyle::Title => title_case(input),
    }
}
