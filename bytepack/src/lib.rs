#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]
#![allow(clippy::module_name_repetitions)]
#![deny(unsafe_code)]
//! Serialization of wire formats onto flat bytestreams.
//!
//! Types that know their own wire layout implement [`ToBytestream`] and
//! [`FromBytestream`]. Both traits operate on slim stream wrappers that
//! support `std::io::Read`/`Write`, so `byteorder`s extension traits apply
//! directly.

use std::{
    io::{self, Read, Write},
    net::Ipv6Addr,
};

#[cfg(test)]
mod tests;

pub use byteorder::*;

/// Serialization of `self` onto a bytestream.
///
/// If the type also implements [`FromBytestream`], parsing is expected to
/// invert serialization.
pub trait ToBytestream {
    /// The error type emitted by failed serializations.
    type Error;

    /// Appends the wire representation of `self` to `stream`.
    ///
    /// # Errors
    ///
    /// Fails if the stream rejects the write, or a layout invariant of
    /// `self` cannot be expressed on the wire.
    fn to_bytestream(&self, stream: &mut BytestreamWriter) -> Result<(), Self::Error>;

    /// Serializes `self` into a fresh bytevector.
    ///
    /// # Errors
    ///
    /// See [`ToBytestream::to_bytestream`].
    fn to_vec(&self) -> Result<Vec<u8>, Self::Error> {
        let mut vec = Vec::new();
        let mut stream = BytestreamWriter { buf: &mut vec };
        self.to_bytestream(&mut stream)?;
        Ok(vec)
    }

    /// Serializes `self` onto the end of an existing vector.
    ///
    /// # Errors
    ///
    /// See [`ToBytestream::to_bytestream`]. On failure `buf` may hold a
    /// partial write.
    fn append_to_vec(&self, buf: &mut Vec<u8>) -> Result<(), Self::Error> {
        let mut stream = BytestreamWriter { buf };
        self.to_bytestream(&mut stream)?;
        Ok(())
    }
}

/// A writable bytestream backed by a growable buffer.
#[derive(Debug)]
pub struct BytestreamWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl BytestreamWriter<'_> {
    /// Reserves space for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// The number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Indicates whether no bytes were written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for BytestreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.buf.flush()
    }
}

/// Deserialization of `Self` from a bytestream.
pub trait FromBytestream: Sized {
    /// The error type emitted by failed parses.
    type Error;

    /// Parses an instance of `Self` from the front of `stream`.
    ///
    /// Implementations need not consume the stream fully.
    ///
    /// # Errors
    ///
    /// Returns an implementation-defined error if the bytes do not form a
    /// valid instance.
    fn from_bytestream(stream: &mut BytestreamReader) -> Result<Self, Self::Error>;

    /// Parses an instance of `Self` from a slice, discarding the tail.
    ///
    /// # Errors
    ///
    /// See [`FromBytestream::from_bytestream`].
    fn from_slice(slice: &[u8]) -> Result<Self, Self::Error> {
        let mut reader = BytestreamReader { slice };
        Self::from_bytestream(&mut reader)
    }

    /// Parses an instance of `Self` from a slice, advancing the slice past
    /// the consumed bytes on success. On error the slice is untouched.
    ///
    /// # Errors
    ///
    /// See [`FromBytestream::from_bytestream`].
    fn read_from_slice(slice: &mut &[u8]) -> Result<Self, Self::Error> {
        let mut reader = BytestreamReader { slice };
        let object = Self::from_bytestream(&mut reader)?;
        *slice = reader.slice;
        Ok(object)
    }
}

/// A readable bytestream over a borrowed slice.
#[derive(Debug)]
pub struct BytestreamReader<'a> {
    slice: &'a [u8],
}

impl BytestreamReader<'_> {
    /// Splits a substream of length `n` off the front.
    ///
    /// # Errors
    ///
    /// Fails if fewer than `n` bytes remain.
    pub fn extract(&mut self, n: usize) -> io::Result<BytestreamReader<'_>> {
        if self.slice.len() < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "invalid substream length",
            ));
        }
        let stream = BytestreamReader {
            slice: &self.slice[..n],
        };
        self.slice = &self.slice[n..];
        Ok(stream)
    }

    /// The number of unconsumed bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.slice.len()
    }

    /// Indicates whether the stream is fully consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }
}

impl Read for BytestreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let min = buf.len().min(self.slice.len());
        buf[..min].copy_from_slice(&self.slice[..min]);
        self.slice = &self.slice[min..];
        Ok(min)
    }
}

impl ToBytestream for Ipv6Addr {
    type Error = io::Error;
    fn to_bytestream(&self, stream: &mut BytestreamWriter) -> Result<(), Self::Error> {
        stream.write_all(&self.octets())
    }
}

impl FromBytestream for Ipv6Addr {
    type Error = io::Error;
    fn from_bytestream(stream: &mut BytestreamReader) -> Result<Self, Self::Error> {
        Ok(Ipv6Addr::from(stream.read_u128::<BE>()?))
    }
}

/// Implements `ToBytestream`/`FromBytestream` glue for field-less enums
/// with a primitive `#[repr]`.
#[macro_export]
macro_rules! raw_enum {
    ($(#[$outer:meta])*
    $vis: vis enum $ident: ident {
        type Repr = $repr:ty where $order:ty;
        $(
            $(#[$inner:meta])*
            $variant:ident = $prim:literal,
        )+
    }) => {
        $(#[$outer])*
        #[repr($repr)]
        $vis enum $ident {
            $(
                $(#[$inner])*
                $variant = $prim,
            )+
        }

        impl ::std::str::FromStr for $ident {
            type Err = ::std::io::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(
                        stringify!($variant) => Ok(Self::$variant),
                    )+
                    _ => Err(::std::io::Error::new(
                        ::std::io::ErrorKind::InvalidInput,
                        "unknown string"
                    ))
                }
            }
        }

        impl $ident {
            $vis fn from_raw_repr(repr: $repr) -> ::std::io::Result<Self> {
                match repr {
                    $(
                        $prim => Ok(Self::$variant),
                    )+
                    _ => Err(::std::io::Error::new(
                        ::std::io::ErrorKind::InvalidInput,
                        "unknown discriminant"
                    ))
                }
            }

            $vis fn to_raw_repr(&self) -> $repr {
                *self as $repr
            }
        }
    };
}
