//! Decoding of runtime dispatch errors into something a caller can print.
use core::fmt;

use snafu::Snafu;
use subxt::Metadata;

/// Human-readable description of a pallet error, resolved from chain metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleErrorDetails {
    /// Name of the pallet that raised the error.
    pub pallet: String,
    /// Name of the error variant.
    pub name: String,
    /// The error's doc lines joined with spaces. May be empty.
    pub docs: String,
}

impl fmt::Display for ModuleErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pallet, self.name)?;
        if !self.docs.is_empty() {
            write!(f, " ({})", self.docs)?;
        }
        Ok(())
    }
}

/// A dispatch error reported for an extrinsic that made it into a block.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum DispatchFailure {
    /// A pallet returned one of its declared errors.
    ///
    /// The raw indices are always present; `details` is filled in only if the
    /// metadata knows about them.
    #[snafu(display(
        "module error (pallet index {pallet_index}, error index {error_index}){}",
        details.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
    ))]
    Module {
        /// Index of the pallet in the runtime.
        pallet_index: u8,
        /// Index of the error within the pallet's error enum.
        error_index: u8,
        /// Resolved names, if any.
        details: Option<ModuleErrorDetails>,
    },

    /// Any other dispatch error, e.g. `BadOrigin` or an arithmetic error.
    #[snafu(display("{description}"))]
    Other {
        /// Debug rendering of the dispatch error.
        description: String,
    },
}

impl DispatchFailure {
    /// Builds a module failure from raw indices, resolving names through `metadata`.
    pub fn from_module_indices(metadata: &Metadata, pallet_index: u8, error_index: u8) -> Self {
        DispatchFailure::Module {
            pallet_index,
            error_index,
            details: resolve_module_error(metadata, pallet_index, error_index),
        }
    }

    /// Converts the dispatch error reported by `subxt`.
    pub fn from_subxt(dispatch_error: &subxt::error::DispatchError, metadata: &Metadata) -> Self {
        match dispatch_error {
            subxt::error::DispatchError::Module(module_error) => {
                let bytes = module_error.bytes();
                Self::from_module_indices(metadata, bytes[0], bytes[1])
            }
            other => DispatchFailure::Other {
                description: format!("{other:?}"),
            },
        }
    }
}

/// Looks up the pallet and error variant for a module error.
///
/// Returns `None` if either index is unknown to `metadata`.
pub fn resolve_module_error(
    metadata: &Metadata,
    pallet_index: u8,
    error_index: u8,
) -> Option<ModuleErrorDetails> {
    let pallet = metadata.pallet_by_index(pallet_index)?;
    let variant = pallet.error_variant_by_index(error_index)?;

    Some(ModuleErrorDetails {
        pallet: pallet.name().to_owned(),
        name: variant.name.clone(),
        docs: variant.docs.join(" ").trim().to_owned(),
    })
}
