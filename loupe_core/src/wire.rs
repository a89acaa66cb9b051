//! Binary payloads exchanged with the UI for bridged operations.
//!
//! All integers are little-endian `i32`. A string is its UTF-8 byte length
//! followed by the bytes, a bool is one byte (`0` or `1`), and a list is its
//! item count followed by the items. A [`ProviderModule`] is a tag
//! (`0` Upsource, `1` GitHub, `2` GitLab) followed by its two strings in
//! declaration order; a [`ProviderSettings`] is id, name, then module.

use loupe_api::{ProviderModule, ProviderSettings};

use crate::bridge::Operation;
use crate::{Error, Result};

/// `GetReviews { provider_id }`
pub const GET_REVIEWS: i32 = 0;
/// `GetReviewDiscussions { provider_id, review_id }`
pub const GET_REVIEW_DISCUSSIONS: i32 = 1;
/// `GetReviewFileSummaries { provider_id, review_id }`
pub const GET_REVIEW_FILE_SUMMARIES: i32 = 2;
/// `GetReviewFile { provider_id, review_id, file_path, revision }`
pub const GET_REVIEW_FILE: i32 = 3;
/// `MarkFileRead { provider_id, review_id, file_path, revision, read }`
pub const MARK_FILE_READ: i32 = 4;
/// `ConfigureModules { modules }`
pub const CONFIGURE_MODULES: i32 = 5;

const TAG_UPSOURCE: i32 = 0;
const TAG_GITHUB: i32 = 1;
const TAG_GITLAB: i32 = 2;

/// Decode the payload of operation `code`.
///
/// # Errors
///
/// Returns [`Error::Serialization`] for unknown codes or tags, truncated
/// input, negative lengths, invalid UTF-8, bools other than `0`/`1`, and
/// trailing bytes.
pub fn decode_operation(code: i32, payload: &[u8]) -> Result<Operation> {
    let mut reader = Reader::new(payload);
    let operation = match code {
        GET_REVIEWS => Operation::GetReviews {
            provider_id: reader.string()?,
        },
        GET_REVIEW_DISCUSSIONS => Operation::GetReviewDiscussions {
            provider_id: reader.string()?,
            review_id: reader.string()?,
        },
        GET_REVIEW_FILE_SUMMARIES => Operation::GetReviewFileSummaries {
            provider_id: reader.string()?,
            review_id: reader.string()?,
        },
        GET_REVIEW_FILE => Operation::GetReviewFile {
            provider_id: reader.string()?,
            review_id: reader.string()?,
            file_path: reader.string()?,
            revision: reader.string()?,
        },
        MARK_FILE_READ => Operation::MarkFileRead {
            provider_id: reader.string()?,
            review_id: reader.string()?,
            file_path: reader.string()?,
            revision: reader.string()?,
            read: reader.bool()?,
        },
        CONFIGURE_MODULES => Operation::ConfigureModules {
            modules: reader.list(Reader::settings)?,
        },
        other => return Err(Error::serialization(format!("unknown operation code {other}"))),
    };
    reader.finish()?;
    Ok(operation)
}

/// Encode `operation` into its code and payload.
///
/// # Errors
///
/// Returns [`Error::Serialization`] when a string or list is longer than
/// `i32::MAX`.
pub fn encode_operation(operation: &Operation) -> Result<(i32, Vec<u8>)> {
    let mut writer = Writer::default();
    let code = match operation {
        Operation::GetReviews { provider_id } => {
            writer.string(provider_id)?;
            GET_REVIEWS
        }
        Operation::GetReviewDiscussions {
            provider_id,
            review_id,
        } => {
            writer.string(provider_id)?;
            writer.string(review_id)?;
            GET_REVIEW_DISCUSSIONS
        }
        Operation::GetReviewFileSummaries {
            provider_id,
            review_id,
        } => {
            writer.string(provider_id)?;
            writer.string(review_id)?;
            GET_REVIEW_FILE_SUMMARIES
        }
        Operation::GetReviewFile {
            provider_id,
            review_id,
            file_path,
            revision,
        } => {
            for value in [provider_id, review_id, file_path, revision] {
                writer.string(value)?;
            }
            GET_REVIEW_FILE
        }
        Operation::MarkFileRead {
            provider_id,
            review_id,
            file_path,
            revision,
            read,
        } => {
            for value in [provider_id, review_id, file_path, revision] {
                writer.string(value)?;
            }
            writer.bytes.push(u8::from(*read));
            MARK_FILE_READ
        }
        Operation::ConfigureModules { modules } => {
            writer.len(modules.len())?;
            for entry in modules {
                writer.settings(entry)?;
            }
            CONFIGURE_MODULES
        }
    };
    Ok((code, writer.bytes))
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                Error::serialization(format!(
                    "truncated payload: need {count} bytes at offset {}",
                    self.offset
                ))
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn i32(&mut self) -> Result<i32> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(buf))
    }

    fn len(&mut self) -> Result<usize> {
        let raw = self.i32()?;
        usize::try_from(raw).map_err(|_| Error::serialization(format!("negative length {raw}")))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| Error::serialization(format!("invalid UTF-8: {err}")))
    }

    fn bool(&mut self) -> Result<bool> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::serialization(format!("invalid bool byte {other}"))),
        }
    }

    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.len()?;
        let remaining = self.bytes.len() - self.offset;
        let mut items = Vec::with_capacity(count.min(remaining));
        for _ in 0..count {
            items.push(item(self)?);
        }
        Ok(items)
    }

    fn module(&mut self) -> Result<ProviderModule> {
        let module = match self.i32()? {
            TAG_UPSOURCE => ProviderModule::Upsource {
                url: self.string()?,
                token: self.string()?,
            },
            TAG_GITHUB => ProviderModule::Github {
                token: self.string()?,
                query: self.string()?,
            },
            TAG_GITLAB => ProviderModule::Gitlab {
                url: self.string()?,
                token: self.string()?,
            },
            other => return Err(Error::serialization(format!("unknown module tag {other}"))),
        };
        Ok(module)
    }

    fn settings(&mut self) -> Result<ProviderSettings> {
        Ok(ProviderSettings {
            id: self.string()?,
            name: self.string()?,
            module: self.module()?,
        })
    }

    fn finish(&self) -> Result<()> {
        let trailing = self.bytes.len() - self.offset;
        if trailing == 0 {
            Ok(())
        } else {
            Err(Error::serialization(format!("{trailing} trailing bytes")))
        }
    }
}

#[derive(Default)]
struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn len(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| Error::serialization(format!("length {len} does not fit in i32")))?;
        self.i32(len);
        Ok(())
    }

    fn string(&mut self, value: &str) -> Result<()> {
        self.len(value.len())?;
        self.bytes.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn settings(&mut self, entry: &ProviderSettings) -> Result<()> {
        self.string(&entry.id)?;
        self.string(&entry.name)?;
        let (tag, first, second) = match &entry.module {
            ProviderModule::Upsource { url, token } => (TAG_UPSOURCE, url, token),
            ProviderModule::Github { token, query } => (TAG_GITHUB, token, query),
            ProviderModule::Gitlab { url, token } => (TAG_GITLAB, url, token),
        };
        self.i32(tag);
        self.string(first)?;
        self.string(second)
    }
}
