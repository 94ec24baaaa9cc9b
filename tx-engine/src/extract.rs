//! Locating and decoding domain events in the event list of an included extrinsic.
//!
//! An [`ExtractionSpec`] names the (pallet, event) pair to look for and the decoder to
//! run on its fields. Specs are plain values, so several of them can be composed in a
//! tuple and evaluated together with [`ExtractionSet::extract_all`].
use std::collections::HashMap;
use std::fmt;

use codec::Decode;
use snafu::{OptionExt, ResultExt};

use crate::error::{
    DecodeError, DecodeSnafu, EventNotFoundSnafu, Result, ScaleSnafu, TrailingBytesSnafu,
};
use crate::status::{BlockInclusion, LedgerEvent};

/// A pure function from SCALE encoded event fields to a domain value.
pub type Decoder<T> = fn(&[u8]) -> Result<T, DecodeError>;

/// Which event to look for and how to decode it.
pub struct ExtractionSpec<T> {
    /// Pallet that emits the event.
    pub pallet: &'static str,
    /// Event variant name.
    pub event: &'static str,
    /// Decoder for the event fields.
    pub decoder: Decoder<T>,
}

impl<T> ExtractionSpec<T> {
    /// Creates a spec with a custom decoder.
    pub const fn new(pallet: &'static str, event: &'static str, decoder: Decoder<T>) -> Self {
        Self {
            pallet,
            event,
            decoder,
        }
    }

    /// Decodes the first matching event in `inclusion`.
    pub fn extract(&self, inclusion: &BlockInclusion) -> Result<T> {
        extract(inclusion, self)
    }
}

impl<T: Decode> ExtractionSpec<T> {
    /// Creates a spec that SCALE decodes the event fields into `T`.
    pub const fn scale(pallet: &'static str, event: &'static str) -> Self {
        Self::new(pallet, event, decode_scale::<T>)
    }
}

impl<T> Clone for ExtractionSpec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ExtractionSpec<T> {}

impl<T> fmt::Debug for ExtractionSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionSpec")
            .field("pallet", &self.pallet)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Finds the first event matching `spec` and decodes it.
///
/// Later matches are never looked at. A missing event is reported as
/// [`Error::EventNotFound`](crate::error::Error::EventNotFound), a decoder failure as
/// [`Error::Decode`](crate::error::Error::Decode).
///
/// # Arguments
///
/// * `inclusion` - The block inclusion whose events are searched.
/// * `spec` - The pallet and event name to match, and the decoder for its fields.
///
/// # Returns
///
/// Returns the decoded value of the first matching event.
pub fn extract<T>(inclusion: &BlockInclusion, spec: &ExtractionSpec<T>) -> Result<T> {
    let event = inclusion
        .events
        .iter()
        .find(|event| event.is(spec.pallet, spec.event))
        .context(EventNotFoundSnafu {
            pallet: spec.pallet,
            event: spec.event,
        })?;

    (spec.decoder)(&event.fields).context(DecodeSnafu {
        pallet: spec.pallet,
        event: spec.event,
    })
}

/// Decodes `bytes` as `T`, rejecting leftover input.
pub fn decode_scale<T: Decode>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut input = bytes;
    let value = T::decode(&mut input).context(ScaleSnafu)?;

    if !input.is_empty() {
        return TrailingBytesSnafu {
            remaining: input.len(),
        }
        .fail();
    }

    Ok(value)
}

/// One or more extraction specs evaluated against the same inclusion.
pub trait ExtractionSet {
    /// The decoded values, in spec order.
    type Output;

    /// Runs every extraction in order, failing on the first one that fails.
    fn extract_all(&self, inclusion: &BlockInclusion) -> Result<Self::Output>;
}

impl<T> ExtractionSet for ExtractionSpec<T> {
    type Output = T;

    fn extract_all(&self, inclusion: &BlockInclusion) -> Result<T> {
        self.extract(inclusion)
    }
}

macro_rules! impl_extraction_set_for_tuple {
    ($($name:ident => $spec:ident),+) => {
        impl<$($name),+> ExtractionSet for ($(ExtractionSpec<$name>,)+) {
            type Output = ($($name,)+);

            fn extract_all(&self, inclusion: &BlockInclusion) -> Result<Self::Output> {
                let ($($spec,)+) = self;
                Ok(($($spec.extract(inclusion)?,)+))
            }
        }
    };
}

impl_extraction_set_for_tuple!(A => a);
impl_extraction_set_for_tuple!(A => a, B => b);
impl_extraction_set_for_tuple!(A => a, B => b, C => c);
impl_extraction_set_for_tuple!(A => a, B => b, C => c, D => d);

/// Maps (pallet, event) tags to decoders producing one tagged domain type.
pub struct DecoderRegistry<E> {
    /// Decoders keyed by pallet, then event name.
    decoders: HashMap<&'static str, HashMap<&'static str, Decoder<E>>>,
}

impl<E> Default for DecoderRegistry<E> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<E> DecoderRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `decoder` for `pallet.event`, replacing any previous one.
    pub fn register(
        mut self,
        pallet: &'static str,
        event: &'static str,
        decoder: Decoder<E>,
    ) -> Self {
        self.decoders
            .entry(pallet)
            .or_default()
            .insert(event, decoder);
        self
    }

    /// The spec for a registered tag.
    pub fn spec(&self, pallet: &str, event: &str) -> Option<ExtractionSpec<E>> {
        let (&pallet, events) = self.decoders.get_key_value(pallet)?;
        let (&event, &decoder) = events.get_key_value(event)?;
        Some(ExtractionSpec::new(pallet, event, decoder))
    }

    /// Decodes `event` if its tag is registered.
    pub fn decode(&self, event: &LedgerEvent) -> Option<Result<E>> {
        let decoder = self.decoders.get(event.pallet.as_str())?.get(event.event.as_str())?;

        Some(decoder(&event.fields).context(DecodeSnafu {
            pallet: event.pallet.as_str(),
            event: event.event.as_str(),
        }))
    }

    /// Decodes every registered event in `inclusion`, in order, skipping unknown tags.
    pub fn decode_all(&self, inclusion: &BlockInclusion) -> Result<Vec<E>> {
        inclusion
            .events
            .iter()
            .filter_map(|event| self.decode(event))
            .collect()
    }
}
