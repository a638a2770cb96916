//! Command parsing and replies.
//!
//! | Command                               | Reply                                  |
//! |---------------------------------------|----------------------------------------|
//! | `MSGCREATE key fields len ttl`        | 1 created, 0 exists                    |
//! | `MSGAPPEND key field cur prev val`    | new length, 0 if invalidated           |
//! | `MSGAPPENDX key field cur prev val`   | like `MSGAPPEND`, -1 if key is absent  |
//! | `MSGLEN key`                          | length, -1 if absent                   |
//! | `MSGFETCH key [vbegin]`               | field/entries pairs, -1 if absent      |
//! | `MSGREMBYVERSION key [vbegin]`        | removed count, -1 if absent            |

use msgq_core::{FieldId, FieldSnapshot, VectorEntry, Version};

use crate::{
    error::{StoreError, StoreResult},
    store::{Appended, Fetched},
};

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `MSGCREATE`
    Create {
        key: Vec<u8>,
        max_fields: i64,
        max_field_len: i64,
        ttl_secs: i64,
    },
    /// `MSGAPPEND`
    Append {
        key: Vec<u8>,
        field: FieldId,
        entry: VectorEntry,
    },
    /// `MSGAPPENDX`
    AppendIfExists {
        key: Vec<u8>,
        field: FieldId,
        entry: VectorEntry,
    },
    /// `MSGLEN`
    Len { key: Vec<u8> },
    /// `MSGFETCH`
    Fetch { key: Vec<u8>, vbegin: Version },
    /// `MSGREMBYVERSION`
    TrimByVersion { key: Vec<u8>, vbegin: Version },
}

impl Command {
    /// Parse `args`, where `args[0]` is the command name.
    ///
    /// Every argument is validated here, so a command that parses never
    /// fails on malformed input later.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> StoreResult<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Err(StoreError::UnknownCommand(String::new()));
        };
        let rest: Vec<&str> = rest.iter().map(AsRef::as_ref).collect();

        match name.as_ref().to_ascii_lowercase().as_str() {
            "msgcreate" => {
                let [key, max_fields, max_field_len, ttl] = rest[..] else {
                    return Err(StoreError::Arity("msgcreate"));
                };
                Ok(Self::Create {
                    key: key.as_bytes().to_vec(),
                    max_fields: parse_int(max_fields)?,
                    max_field_len: parse_int(max_field_len)?,
                    ttl_secs: parse_int(ttl)?,
                })
            }
            "msgappend" => {
                let (key, field, entry) = parse_append(&rest, "msgappend")?;
                Ok(Self::Append { key, field, entry })
            }
            "msgappendx" => {
                let (key, field, entry) = parse_append(&rest, "msgappendx")?;
                Ok(Self::AppendIfExists { key, field, entry })
            }
            "msglen" => {
                let [key] = rest[..] else {
                    return Err(StoreError::Arity("msglen"));
                };
                Ok(Self::Len {
                    key: key.as_bytes().to_vec(),
                })
            }
            "msgfetch" => {
                let (key, vbegin) = parse_versioned(&rest, "msgfetch")?;
                Ok(Self::Fetch { key, vbegin })
            }
            "msgrembyversion" => {
                let (key, vbegin) = parse_versioned(&rest, "msgrembyversion")?;
                Ok(Self::TrimByVersion { key, vbegin })
            }
            other => Err(StoreError::UnknownCommand(other.to_owned())),
        }
    }
}

fn parse_int(arg: &str) -> StoreResult<i64> {
    arg.parse()
        .map_err(|_| StoreError::Syntax(format!("value is not an integer: '{arg}'")))
}

fn parse_append(
    args: &[&str],
    name: &'static str,
) -> StoreResult<(Vec<u8>, FieldId, VectorEntry)> {
    let [key, field, current, previous, value] = args[..] else {
        return Err(StoreError::Arity(name));
    };
    let entry = VectorEntry::new(parse_int(current)?, parse_int(previous)?, parse_int(value)?);
    let field = parse_int(field)?;
    check_advances(&entry)?;
    Ok((key.as_bytes().to_vec(), field, entry))
}

/// Reject records that would move the version backwards.
pub fn check_advances(entry: &VectorEntry) -> StoreResult<()> {
    if entry.advances() {
        Ok(())
    } else {
        Err(StoreError::NotAdvancing {
            current: entry.current,
            previous: entry.previous,
        })
    }
}

/// `key [vbegin]`, with `vbegin` defaulting to 0.
fn parse_versioned(args: &[&str], name: &'static str) -> StoreResult<(Vec<u8>, Version)> {
    match args[..] {
        [key] => Ok((key.as_bytes().to_vec(), 0)),
        [key, vbegin] => Ok((key.as_bytes().to_vec(), parse_int(vbegin)?)),
        _ => Err(StoreError::Arity(name)),
    }
}

/// A command reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// An integer.
    Integer(i64),
    /// Per-field snapshots; empty when there is nothing new.
    Fields(Vec<FieldSnapshot>),
    /// An error message.
    Error(String),
}

impl Reply {
    /// Sentinel for an absent key.
    pub const NOT_FOUND: Self = Self::Integer(-1);
}

impl From<Appended> for Reply {
    fn from(appended: Appended) -> Self {
        match appended {
            Appended::Length(len) => Self::Integer(len as i64),
            Appended::Invalidated(_) => Self::Integer(0),
        }
    }
}

impl From<Fetched> for Reply {
    fn from(fetched: Fetched) -> Self {
        match fetched {
            Fetched::Fields(fields) => Self::Fields(fields),
            Fetched::Invalidated(_) => Self::NOT_FOUND,
        }
    }
}

/// Entries of a field as one bulk body: `cur prev val` lines joined by CRLF.
#[must_use]
pub fn format_entries(entries: &[VectorEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\r\n")
}

impl core::fmt::Display for Reply {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "(integer) {n}"),
            Self::Error(message) => write!(f, "(error) {message}"),
            Self::Fields(fields) if fields.is_empty() => write!(f, "(empty array)"),
            Self::Fields(fields) => {
                for (i, snapshot) in fields.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    writeln!(f, "{}) \"{}\"", 2 * i + 1, snapshot.field)?;
                    write!(
                        f,
                        "{}) {:?}",
                        2 * i + 2,
                        format_entries(&snapshot.entries)
                    )?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let command = Command::parse(&["MSGCREATE", "q", "2", "3", "60"]).unwrap();
        assert_eq!(
            command,
            Command::Create {
                key: b"q".to_vec(),
                max_fields: 2,
                max_field_len: 3,
                ttl_secs: 60,
            }
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let command = Command::parse(&["msgAppend", "q", "1", "20", "10", "150"]).unwrap();
        assert_eq!(
            command,
            Command::Append {
                key: b"q".to_vec(),
                field: 1,
                entry: VectorEntry::new(20, 10, 150),
            }
        );
    }

    #[test]
    fn test_parse_optional_vbegin() {
        assert_eq!(
            Command::parse(&["MSGFETCH", "q"]).unwrap(),
            Command::Fetch {
                key: b"q".to_vec(),
                vbegin: 0
            }
        );
        assert_eq!(
            Command::parse(&["MSGREMBYVERSION", "q", "25"]).unwrap(),
            Command::TrimByVersion {
                key: b"q".to_vec(),
                vbegin: 25
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse(&["MSGLEN"]),
            Err(StoreError::Arity("msglen"))
        );
        assert_eq!(
            Command::parse(&["MSGFETCH", "q", "1", "2"]),
            Err(StoreError::Arity("msgfetch"))
        );
        assert!(matches!(
            Command::parse(&["MSGAPPEND", "q", "1", "x", "10", "150"]),
            Err(StoreError::Syntax(_))
        ));
        assert_eq!(
            Command::parse(&["MSGAPPEND", "q", "1", "5", "20", "0"]),
            Err(StoreError::NotAdvancing {
                current: 5,
                previous: 20
            })
        );
        assert!(matches!(
            Command::parse(&["MSGAPPENDX", "q", "1", "7", "7", "0"]),
            Err(StoreError::NotAdvancing { .. })
        ));
        assert_eq!(
            Command::parse(&["GET", "q"]),
            Err(StoreError::UnknownCommand("get".into()))
        );
        assert!(matches!(
            Command::parse::<&str>(&[]),
            Err(StoreError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::Integer(3).to_string(), "(integer) 3");
        assert_eq!(Reply::Fields(Vec::new()).to_string(), "(empty array)");

        let reply = Reply::Fields(vec![
            FieldSnapshot {
                field: 1,
                entries: vec![VectorEntry::new(20, 10, 150), VectorEntry::new(30, 20, 160)],
            },
            FieldSnapshot {
                field: 2,
                entries: vec![VectorEntry::new(11, 0, 200)],
            },
        ]);
        assert_eq!(
            reply.to_string(),
            "1) \"1\"\n2) \"20 10 150\\r\\n30 20 160\"\n3) \"2\"\n4) \"11 0 200\""
        );
    }

    #[test]
    fn test_reply_from_outcomes() {
        assert_eq!(Reply::from(Appended::Length(4)), Reply::Integer(4));
        assert_eq!(
            Reply::from(Appended::Invalidated(
                msgq_core::Invalidation::AlreadyInvalidated
            )),
            Reply::Integer(0)
        );
        assert_eq!(
            Reply::from(Fetched::Invalidated(
                msgq_core::Invalidation::AlreadyInvalidated
            )),
            Reply::NOT_FOUND
        );
    }
}
