use darling::Error;
use darling::Result;

/// header key for a struct member: the member name with every `_` removed
pub(crate) fn record_key(ident: &syn::Ident) -> String {
    ident.to_string().chars().filter(|c| *c != '_').collect()
}

pub(crate) fn check_unique(keys: &[(String, &syn::Ident)]) -> Result<()> {
    let mut errors = Vec::new();

    for (idx, (key, ident)) in keys.iter().enumerate() {
        if keys[..idx].iter().any(|(other, _)| other == key) {
            errors.push(
                Error::custom(format!("header key `{}` is produced by more than one member", key))
                    .with_span(*ident),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::multiple(errors))
    }
}
