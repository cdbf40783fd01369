/// Type-state markers for the builder pattern
///
/// These types are used to track which fields have been set
/// in the builder at compile-time, preventing a server without
/// an encoder or decoder from being built.

use std::marker::PhantomData;

/// Marker trait for encoder state
pub trait EncoderState {}

/// Encoder has not been set
pub struct NoEncoder;
impl EncoderState for NoEncoder {}

/// Encoder has been set
pub struct HasEncoder;
impl EncoderState for HasEncoder {}

/// Marker trait for decoder state
pub trait DecoderState {}

/// Decoder has not been set
pub struct NoDecoder;
impl DecoderState for NoDecoder {}

/// Decoder has been set
pub struct HasDecoder;
impl DecoderState for HasDecoder {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<E, D> {
    _encoder: PhantomData<E>,
    _decoder: PhantomData<D>,
}

impl<E, D> TypeState<E, D> {
    pub(crate) fn new() -> Self {
        Self {
            _encoder: PhantomData,
            _decoder: PhantomData,
        }
    }
}

impl<E, D> Default for TypeState<E, D> {
    fn default() -> Self {
        Self::new()
    }
}
