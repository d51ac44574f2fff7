// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Incremental JSON emission into an in-memory buffer.
//!
//! [`JsonWriter`] drives a [`serde_json::ser::Formatter`] by hand so a
//! document can be produced piece by piece: open a container, write some
//! properties, come back later and write more. A stack of open containers
//! acts as the cursor; it decides where separators go and catches
//! mismatched closes.
//!
//! The writer never touches I/O. Callers drain [`JsonWriter::buffered`]
//! into their sink whenever they choose to flush.

use serde_json::ser::Formatter;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    container: Container,
    first: bool,
}

/// A buffered, container-aware JSON emitter.
#[derive(Debug)]
pub struct JsonWriter<F> {
    buf: Vec<u8>,
    formatter: F,
    frames: Vec<Frame>,
}

impl<F> JsonWriter<F> {
    /// Creates an empty writer using the given formatter for layout.
    pub const fn new(formatter: F) -> Self {
        Self {
            buf: Vec::new(),
            formatter,
            frames: Vec::new(),
        }
    }

    /// Number of containers currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bytes produced since the last [`clear`](Self::clear).
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Discards buffered bytes, keeping the allocation and cursor.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drops buffered bytes and frees the buffer allocation.
    pub fn release(&mut self) {
        self.buf = Vec::new();
    }
}

impl<F: Formatter> JsonWriter<F> {
    /// Opens an anonymous object (the root, or an array element).
    ///
    /// # Errors
    ///
    /// Returns an error if an object is open, since its members need names.
    pub fn start_object(&mut self) -> io::Result<()> {
        self.begin_value()?;
        self.formatter.begin_object(&mut self.buf)?;
        self.push(Container::Object);
        Ok(())
    }

    /// Opens an object as the value of property `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn start_object_property(&mut self, name: &str) -> io::Result<()> {
        self.property_name(name)?;
        self.formatter.begin_object_value(&mut self.buf)?;
        self.formatter.begin_object(&mut self.buf)?;
        self.push(Container::Object);
        Ok(())
    }

    /// Closes the innermost container, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn end_object(&mut self) -> io::Result<()> {
        self.pop(Container::Object)?;
        self.formatter.end_object(&mut self.buf)?;
        self.end_value()
    }

    /// Opens an array as the value of property `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn start_array_property(&mut self, name: &str) -> io::Result<()> {
        self.property_name(name)?;
        self.formatter.begin_object_value(&mut self.buf)?;
        self.formatter.begin_array(&mut self.buf)?;
        self.push(Container::Array);
        Ok(())
    }

    /// Closes the innermost container, which must be an array.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an array.
    pub fn end_array(&mut self) -> io::Result<()> {
        self.pop(Container::Array)?;
        self.formatter.end_array(&mut self.buf)?;
        self.end_value()
    }

    /// Writes a string property.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn string(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.property(name, |buf, _| write_escaped(buf, value))
    }

    /// Writes a string property, or `null` when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn string_or_null(&mut self, name: &str, value: Option<&str>) -> io::Result<()> {
        match value {
            Some(value) => self.string(name, value),
            None => self.property(name, |buf, formatter| formatter.write_null(buf)),
        }
    }

    /// Writes a boolean property.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn bool(&mut self, name: &str, value: bool) -> io::Result<()> {
        self.property(name, |buf, formatter| formatter.write_bool(buf, value))
    }

    /// Writes an unsigned integer property.
    ///
    /// # Errors
    ///
    /// Returns an error if the innermost container is not an object.
    pub fn number(&mut self, name: &str, value: u64) -> io::Result<()> {
        self.property(name, |buf, formatter| formatter.write_u64(buf, value))
    }

    fn property<W>(&mut self, name: &str, write: W) -> io::Result<()>
    where
        W: FnOnce(&mut Vec<u8>, &mut F) -> io::Result<()>,
    {
        self.property_name(name)?;
        self.formatter.begin_object_value(&mut self.buf)?;
        write(&mut self.buf, &mut self.formatter)?;
        self.formatter.end_object_value(&mut self.buf)
    }

    fn property_name(&mut self, name: &str) -> io::Result<()> {
        let frame = match self.frames.last_mut() {
            Some(frame) if frame.container == Container::Object => frame,
            _ => return Err(io::Error::other(format!("property `{name}` outside an object"))),
        };
        let first = std::mem::replace(&mut frame.first, false);

        self.formatter.begin_object_key(&mut self.buf, first)?;
        write_escaped(&mut self.buf, name)?;
        self.formatter.end_object_key(&mut self.buf)
    }

    /// Prepares for an anonymous value: only legal at the root or in an array.
    fn begin_value(&mut self) -> io::Result<()> {
        match self.frames.last_mut() {
            None => Ok(()),
            Some(frame) if frame.container == Container::Array => {
                let first = std::mem::replace(&mut frame.first, false);
                self.formatter.begin_array_value(&mut self.buf, first)
            }
            Some(_) => Err(io::Error::other("unnamed value inside an object")),
        }
    }

    /// Finishes the value just written, relative to its parent container.
    fn end_value(&mut self) -> io::Result<()> {
        match self.frames.last() {
            None => Ok(()),
            Some(frame) if frame.container == Container::Array => {
                self.formatter.end_array_value(&mut self.buf)
            }
            Some(_) => self.formatter.end_object_value(&mut self.buf),
        }
    }

    fn push(&mut self, container: Container) {
        self.frames.push(Frame {
            container,
            first: true,
        });
    }

    fn pop(&mut self, expected: Container) -> io::Result<()> {
        match self.frames.pop() {
            Some(frame) if frame.container == expected => Ok(()),
            Some(frame) => {
                self.frames.push(frame);
                Err(io::Error::other(format!(
                    "cannot close {expected:?}: innermost container is {:?}",
                    frame.container
                )))
            }
            None => Err(io::Error::other(format!(
                "cannot close {expected:?}: no container is open"
            ))),
        }
    }
}

fn write_escaped(buf: &mut Vec<u8>, value: &str) -> io::Result<()> {
    serde_json::to_writer(buf, value).map_err(io::Error::from)
}
