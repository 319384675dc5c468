//! The resumable parse loop.
//!
//! A `ParseTask` pulls events from a namespace-aware quick-xml reader and
//! forwards them to a `TreeBuilder`. It checks the well-formedness rules the
//! tokenizer leaves to its caller (element-name syntax, text outside the root,
//! unclosed elements at end of input, multiple roots) and implements lenient
//! recovery when `strict` is off.
//!
//! The loop can run to completion in one go or in steps of roughly
//! `chunk_size` input bytes, yielding `Poll::Pending` between steps.

use std::borrow::Cow;
use std::task::Poll;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;

use super::locator::Locator;
use crate::builder::{OpenTag, RawAttribute, TreeBuilder};
use crate::error::{Error, Result};
use crate::node::{split_qname, Namespace};
use crate::options::ParseOptions;
use crate::value::Value;

/// A parse in progress.
///
/// Created by `XmlParser::stream`. Drive it with `poll_chunk` until it returns
/// `Poll::Ready`, or call `run` to finish in one go. Dropping an unfinished task
/// abandons the parse.
pub struct ParseTask<'a> {
    reader: NsReader<&'a [u8]>,
    builder: TreeBuilder<'a>,
    options: &'a ParseOptions,
    locator: Locator<'a>,
    chunk_size: usize,
    next_yield: usize,
    seen_root: bool,
    finished: bool,
}

impl<'a> ParseTask<'a> {
    pub(crate) fn new(options: &'a ParseOptions, input: &'a str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);

        let mut reader = NsReader::from_str(input);
        let config = reader.config_mut();
        config.trim_text_start = false;
        config.trim_text_end = false;
        config.expand_empty_elements = true;
        config.check_end_names = options.strict;
        config.allow_unmatched_ends = !options.strict;

        let chunk_size = if options.async_mode {
            options.chunk_size
        } else {
            usize::MAX
        };

        ParseTask {
            reader,
            builder: TreeBuilder::new(options),
            options,
            locator: Locator::new(input),
            chunk_size,
            next_yield: chunk_size,
            seen_root: false,
            finished: false,
        }
    }

    /// Returns true once the task has produced its outcome.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of input bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    /// Feeds the next chunk of input to the builder.
    ///
    /// Returns `Poll::Pending` when a chunk boundary was crossed and input
    /// remains, and `Poll::Ready` with the outcome once the document ended or
    /// failed. Polling a finished task yields `Error::Finished`.
    pub fn poll_chunk(&mut self) -> Poll<Result<Option<Value>>> {
        if self.finished {
            return Poll::Ready(Err(Error::Finished));
        }
        loop {
            match self.step() {
                Ok(true) => {
                    self.finished = true;
                    log::debug!("parse finished after {} bytes", self.consumed());
                    return Poll::Ready(Ok(self.builder.take_result()));
                }
                Ok(false) => {
                    let consumed = self.consumed();
                    if consumed >= self.next_yield {
                        self.next_yield = consumed.saturating_add(self.chunk_size);
                        log::trace!("yielding after {} bytes", consumed);
                        return Poll::Pending;
                    }
                }
                Err(err) => {
                    self.finished = true;
                    self.builder.reset();
                    log::debug!("parse failed: {}", err);
                    return Poll::Ready(Err(err));
                }
            }
        }
    }

    /// Drives the task to completion.
    pub fn run(mut self) -> Result<Option<Value>> {
        loop {
            if let Poll::Ready(outcome) = self.poll_chunk() {
                return outcome;
            }
        }
    }

    /// Processes one tokenizer event. Returns true at end of input.
    fn step(&mut self) -> Result<bool> {
        let offset = self.consumed();
        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                let at = self.reader.error_position() as usize;
                return Err(self.syntax_error(err.to_string(), at));
            }
        };

        match event {
            Event::Start(e) => self.open(&e, offset)?,
            Event::Empty(e) => {
                self.open(&e, offset)?;
                self.builder.close_tag()?;
            }
            Event::End(e) => {
                if self.options.strict {
                    self.builder.close_tag()?;
                } else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.builder.close_named(&name)?;
                }
            }
            Event::Text(e) => {
                let text = String::from_utf8_lossy(&e);
                self.text(&text, offset)?;
            }
            Event::CData(e) => {
                if self.builder.depth() == 0 {
                    if self.options.strict {
                        return Err(self.outside_root(offset));
                    }
                    log::trace!("ignoring CDATA outside the root element");
                } else {
                    self.builder.cdata(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e).into_owned();
                let text = match resolve_entity(&name) {
                    Some(resolved) => resolved,
                    None if self.options.strict => {
                        return Err(self.syntax_error("Invalid character entity".to_string(), offset));
                    }
                    None => {
                        log::debug!("keeping unknown entity &{};", name);
                        Cow::Owned(format!("&{};", name))
                    }
                };
                self.text(&text, offset)?;
            }
            Event::Comment(e) => self.builder.comment(&String::from_utf8_lossy(&e)),
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                log::trace!("skipping prolog event at byte {}", offset);
            }
            Event::Eof => {
                self.end_of_input(offset)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn open(&mut self, e: &BytesStart<'_>, offset: usize) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        if self.options.strict {
            if self.seen_root && self.builder.depth() == 0 {
                return Err(self.syntax_error("Multiple root elements".to_string(), offset));
            }
            if !is_valid_name(&name) {
                return Err(self.syntax_error("Invalid element name".to_string(), offset + 1));
            }
        }
        self.seen_root = true;

        let namespace = if self.options.xmlns {
            let (resolved, local) = self.reader.resolver().resolve_element(e.name());
            bound_namespace(resolved, &name, local.as_ref())
        } else {
            None
        };

        let attributes = if self.options.ignore_attrs {
            Vec::new()
        } else {
            self.attributes(e, offset)?
        };

        let position = self.locator.locate(offset);
        self.builder.open_tag(OpenTag {
            name,
            attributes,
            namespace,
            position,
        });
        Ok(())
    }

    fn attributes(&mut self, e: &BytesStart<'_>, offset: usize) -> Result<Vec<RawAttribute>> {
        let strict = self.options.strict;
        let attrs = if strict {
            e.attributes()
        } else {
            let mut attrs = e.html_attributes();
            attrs.with_checks(false);
            attrs
        };

        let mut out = Vec::new();
        for attr in attrs {
            let attr = match attr {
                Ok(attr) => attr,
                Err(err) if strict => return Err(self.syntax_error(err.to_string(), offset)),
                Err(err) => {
                    log::debug!("skipping malformed attribute: {}", err);
                    continue;
                }
            };

            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(err) if strict => return Err(self.syntax_error(err.to_string(), offset)),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            let namespace = if self.options.xmlns {
                self.attribute_namespace(attr.key, &name)
            } else {
                None
            };

            out.push(RawAttribute {
                name,
                value,
                namespace,
            });
        }
        Ok(out)
    }

    fn attribute_namespace(&self, key: QName<'_>, name: &str) -> Option<Namespace> {
        let (resolved, local) = self.reader.resolver().resolve_attribute(key);
        bound_namespace(resolved, name, local.as_ref())
    }

    fn text(&mut self, text: &str, offset: usize) -> Result<()> {
        if self.builder.depth() == 0 {
            if self.options.strict && !text.trim().is_empty() {
                return Err(self.outside_root(offset));
            }
            log::trace!("ignoring text outside the root element");
            return Ok(());
        }
        self.builder.text(text);
        Ok(())
    }

    fn end_of_input(&mut self, offset: usize) -> Result<()> {
        if self.builder.depth() == 0 {
            return Ok(());
        }
        if self.options.strict {
            return Err(self.syntax_error("Unclosed root tag".to_string(), offset));
        }
        log::debug!("closing {} unclosed element(s) at end of input", self.builder.depth());
        self.builder.close_all()
    }

    fn outside_root(&mut self, offset: usize) -> Error {
        let message = if self.seen_root {
            "Text data outside of root node."
        } else {
            "Non-whitespace before first tag."
        };
        self.syntax_error(message.to_string(), offset)
    }

    fn syntax_error(&mut self, message: String, offset: usize) -> Error {
        let position = self.locator.locate(offset);
        Error::Syntax {
            message,
            line: position.line,
            column: position.column,
            character: self.locator.char_at(offset),
        }
    }
}

fn bound_namespace(resolved: ResolveResult<'_>, qname: &str, local: &[u8]) -> Option<Namespace> {
    match resolved {
        ResolveResult::Bound(uri) => {
            let prefix = split_qname(qname).0.unwrap_or_default();
            Some(Namespace::new(
                prefix,
                String::from_utf8_lossy(local),
                String::from_utf8_lossy(uri.as_ref()),
            ))
        }
        _ => None,
    }
}

fn resolve_entity(name: &str) -> Option<Cow<'static, str>> {
    match name.strip_prefix('#') {
        Some(reference) => resolve_char_reference(reference).map(|c| Cow::Owned(c.to_string())),
        None => resolve_predefined_entity(name).map(Cow::Borrowed),
    }
}

/// Resolves the part of a character reference after `&#`.
fn resolve_char_reference(reference: &str) -> Option<char> {
    let code_point = match reference.strip_prefix('x').or_else(|| reference.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => reference.parse::<u32>().ok()?,
    };
    char::from_u32(code_point)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':' || !c.is_ascii()
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start(first) => {
            chars.all(|c| is_name_start(c) || c.is_ascii_digit() || matches!(c, '-' | '.'))
        }
        _ => false,
    }
}
