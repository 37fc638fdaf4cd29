mod header_fields;
mod utils;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Implement `ovf::header::HeaderFields` for a struct of `Field<T>` members.
///
/// Every named member becomes a header record keyed by its name with the
/// underscores removed (`x_step_size` reads and writes `xstepsize`). Records
/// are emitted in declaration order.
///
/// Member attributes:
///
/// * `#[ovf(label = "Title")]` spelling used when the record is written
/// * `#[ovf(repeatable)]` repeated records are joined with newlines instead of
///   being rejected as duplicates
/// * `#[ovf(skip)]` the member is not a header record
#[proc_macro_derive(HeaderFields, attributes(ovf))]
pub fn derive_header_fields(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);

    header_fields::derive(&input)
        .unwrap_or_else(darling::Error::write_errors)
        .into()
}
