use std::io::Write;

use crate::client::{fail, Api};
use crate::common::{debug, Error, Result};
use crate::protocol::{Frame, Request};

#[derive(Debug, Default, Clone)]
pub struct QueryOptions {
    // DEL every listed key.
    pub delete: bool,
    // Print values instead of names.
    pub print: bool,
    // Hash fields to print. empty means all fields.
    pub fields: Vec<String>,
    // Pretty print values that parse as json.
    pub json: bool,
}

impl QueryOptions {
    pub fn validate(&self) -> Result<()> {
        if self.delete && self.print {
            return Err(Error::config("can't use --delete and --print together"));
        }
        if (self.delete || !self.print) && (self.json || !self.fields.is_empty()) {
            return Err(Error::config("use --json and --field with --print"));
        }
        Ok(())
    }
}

// Value of a key, fetched with the read command matching its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Vec<u8>),
    // field, value. value is None for a requested field that does not exist.
    Hash(Vec<(String, Option<Vec<u8>>)>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    // member, score
    SortedSet(Vec<(Vec<u8>, String)>),
    // type this tool does not print.
    Unsupported(String),
    // key disappeared.
    Missing,
}

pub async fn fetch_value<C>(client: &mut C, key: &[u8], fields: &[String]) -> Result<Value>
where
    C: Api + ?Sized,
{
    let key_type = client.key_type(key).await?;

    let value = match key_type.as_str() {
        "none" => Value::Missing,
        "string" => match client.command(Request::new("GET").arg(key)).await? {
            Frame::Bulk(value) => Value::String(value),
            Frame::Null => Value::Missing,
            reply => return Err(fail("GET", Some(key), reply)),
        },
        "hash" if fields.is_empty() => {
            let values = bulks(
                "HGETALL",
                key,
                client.command(Request::new("HGETALL").arg(key)).await?,
            )?;
            let mut pairs = Vec::with_capacity(values.len() / 2);
            let mut values = values.into_iter();
            while let (Some(field), Some(value)) = (values.next(), values.next()) {
                pairs.push((String::from_utf8_lossy(&field).into_owned(), Some(value)));
            }
            Value::Hash(pairs)
        }
        "hash" => {
            let request = fields
                .iter()
                .fold(Request::new("HMGET").arg(key), |request, field| {
                    request.arg(field)
                });
            match client.command(request).await? {
                Frame::Array(values) => Value::Hash(
                    fields
                        .iter()
                        .cloned()
                        .zip(values.into_iter().map(|value| match value {
                            Frame::Bulk(value) => Some(value),
                            _ => None,
                        }))
                        .collect(),
                ),
                reply => return Err(fail("HMGET", Some(key), reply)),
            }
        }
        "list" => Value::List(bulks(
            "LRANGE",
            key,
            client
                .command(Request::new("LRANGE").arg(key).arg("0").arg("-1"))
                .await?,
        )?),
        "set" => Value::Set(bulks(
            "SMEMBERS",
            key,
            client.command(Request::new("SMEMBERS").arg(key)).await?,
        )?),
        "zset" => {
            let values = bulks(
                "ZRANGE",
                key,
                client
                    .command(
                        Request::new("ZRANGE")
                            .arg(key)
                            .arg("0")
                            .arg("-1")
                            .arg("WITHSCORES"),
                    )
                    .await?,
            )?;
            let mut pairs = Vec::with_capacity(values.len() / 2);
            let mut values = values.into_iter();
            while let (Some(member), Some(score)) = (values.next(), values.next()) {
                pairs.push((member, String::from_utf8_lossy(&score).into_owned()));
            }
            Value::SortedSet(pairs)
        }
        other => Value::Unsupported(other.to_owned()),
    };

    Ok(value)
}

fn bulks(command: &str, key: &[u8], reply: Frame) -> Result<Vec<Vec<u8>>> {
    match reply {
        Frame::Array(frames) => frames
            .into_iter()
            .map(|frame| match frame {
                Frame::Bulk(value) => Ok(value),
                frame => Err(fail(command, Some(key), frame)),
            })
            .collect(),
        reply => Err(fail(command, Some(key), reply)),
    }
}

// Write a human readable rendition of value. every line is indented by two spaces.
pub fn render_value<W: Write>(out: &mut W, value: &Value, json: bool) -> std::io::Result<()> {
    match value {
        Value::String(value) => writeln!(out, "  {}", render_bytes(value, json)),
        Value::Hash(pairs) => {
            for (field, value) in pairs {
                match value {
                    Some(value) => writeln!(out, "  {}: {}", field, render_bytes(value, json))?,
                    None => writeln!(out, "  {}: (nil)", field)?,
                }
            }
            Ok(())
        }
        Value::List(values) => {
            for (i, value) in values.iter().enumerate() {
                writeln!(out, "  {}) {}", i, String::from_utf8_lossy(value))?;
            }
            Ok(())
        }
        Value::Set(values) => {
            for value in values {
                writeln!(out, "  - {}", String::from_utf8_lossy(value))?;
            }
            Ok(())
        }
        Value::SortedSet(pairs) => {
            for (member, score) in pairs {
                writeln!(out, "  {} ({})", String::from_utf8_lossy(member), score)?;
            }
            Ok(())
        }
        Value::Unsupported(key_type) => writeln!(out, "  ({} is not printable)", key_type),
        Value::Missing => writeln!(out, "  (nil)"),
    }
}

fn render_bytes(value: &[u8], json: bool) -> String {
    if json {
        if let Ok(parsed) = serde_json::from_slice::<serde_json::Value>(value) {
            if let Ok(pretty) = serde_json::to_string_pretty(&parsed) {
                return pretty.replace('\n', "\n  ");
            }
        }
    }
    String::from_utf8_lossy(value).into_owned()
}

// List keys, delete them or print their values according to options.
// return the number of listed keys.
pub async fn query<C, W>(
    client: &mut C,
    keys: &[Vec<u8>],
    options: &QueryOptions,
    out: &mut W,
) -> Result<u64>
where
    C: Api + ?Sized,
    W: Write,
{
    options.validate()?;

    for (i, key) in keys.iter().enumerate() {
        let name = String::from_utf8_lossy(key);
        if options.print {
            let value = fetch_value(client, key, &options.fields).await?;
            writeln!(out, "{}", name)?;
            render_value(out, &value, options.json)?;
            continue;
        }

        writeln!(out, "{}: {}", i + 1, name)?;
        if options.delete {
            client.delete(key).await?;
            debug!(key = %name, "Key deleted");
        }
    }

    out.flush()?;
    Ok(keys.len() as u64)
}
