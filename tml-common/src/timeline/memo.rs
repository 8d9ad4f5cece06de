//! Memo variant schemas and the memo resolver
//!
//! Each variant is a plain struct of optional fields. Field order inside
//! `write` is the wire order; absent fields are omitted, never written as
//! null. `Say` is the one variant stored as raw text instead of grammar
//! bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::discriminant::{Discriminant, MemoKind};
use super::schema::{FieldWriter, Fields};
use crate::error::CodecError;
use crate::legacy::{self, Value};

/// Field-level contract shared by every grammar-encoded memo variant
pub(crate) trait MemoSchema: Sized {
    const NAME: &'static str;
    /// Fields the historical producer always wrote
    const EXPECTED: &'static [&'static str];

    fn read(fields: &Fields<'_>) -> Self;
    fn write(&self, w: &mut FieldWriter);
}

/// Episode or volume total; `"??"` on the wire when the subject has no known count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Total {
    Known(u32),
    Unknown,
}

impl Total {
    pub const UNKNOWN_TEXT: &'static str = "??";

    /// `Unknown` for a zero count, matching what the producer writes
    pub fn from_count(count: u32) -> Self {
        if count == 0 {
            Total::Unknown
        } else {
            Total::Known(count)
        }
    }

    fn read(fields: &Fields<'_>, name: &str) -> Option<Self> {
        if let Some(n) = fields.int::<u32>(name) {
            return Some(Total::Known(n));
        }
        match fields.string(name) {
            Some(s) if s.trim() == Self::UNKNOWN_TEXT => Some(Total::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Total::Known(n) => write!(f, "{}", n),
            Total::Unknown => f.write_str(Self::UNKNOWN_TEXT),
        }
    }
}

fn write_total(w: &mut FieldWriter, name: &str, total: Option<Total>) {
    w.str(name, &total.map(|t| t.to_string()));
}

/// Friend relation (1, 2)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMemo {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
}

impl MemoSchema for RelationMemo {
    const NAME: &'static str = "relation";
    const EXPECTED: &'static [&'static str] = &["uid", "username", "nickname"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            user_id: f.string("uid"),
            username: f.string("username"),
            nickname: f.string("nickname"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("uid", &self.user_id)
            .str("username", &self.username)
            .str("nickname", &self.nickname);
    }
}

/// Group join or creation (1, 3) and (1, 4)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemo {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub group_title: Option<String>,
    pub group_desc: Option<String>,
}

impl MemoSchema for GroupMemo {
    const NAME: &'static str = "group";
    const EXPECTED: &'static [&'static str] = &["grp_id", "grp_name", "grp_title"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            group_id: f.string("grp_id"),
            group_name: f.string("grp_name"),
            group_title: f.string("grp_title"),
            group_desc: f.string("grp_desc"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("grp_id", &self.group_id)
            .str("grp_name", &self.group_name)
            .str("grp_title", &self.group_title)
            .str("grp_desc", &self.group_desc);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiMemo {
    pub subject_name: Option<String>,
    pub subject_name_cn: Option<String>,
    pub subject_id: Option<u32>,
}

impl MemoSchema for WikiMemo {
    const NAME: &'static str = "wiki";
    const EXPECTED: &'static [&'static str] = &["subject_name", "subject_id"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            subject_name: f.string("subject_name"),
            subject_name_cn: f.string("subject_name_cn"),
            subject_id: f.int("subject_id"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("subject_name", &self.subject_name)
            .str("subject_name_cn", &self.subject_name_cn)
            .int("subject_id", self.subject_id);
    }
}

/// Collection of a subject (category 3)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMemo {
    pub subject_id: Option<u32>,
    pub subject_type: Option<u8>,
    pub subject_name: Option<String>,
    pub subject_name_cn: Option<String>,
    pub series: Option<bool>,
    pub comment: Option<String>,
    pub rate: Option<u8>,
}

impl MemoSchema for SubjectMemo {
    const NAME: &'static str = "subject";
    const EXPECTED: &'static [&'static str] = &["subject_id", "subject_type_id", "subject_name"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            subject_id: f.int("subject_id"),
            subject_type: f.int("subject_type_id"),
            subject_name: f.string("subject_name"),
            subject_name_cn: f.string("subject_name_cn"),
            series: f.flag("subject_series"),
            comment: f.string("collect_comment"),
            rate: f.int("collect_rate"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.int_text("subject_id", self.subject_id)
            .int_text("subject_type_id", self.subject_type)
            .str("subject_name", &self.subject_name)
            .str("subject_name_cn", &self.subject_name_cn)
            .flag_text("subject_series", self.series)
            .str("collect_comment", &self.comment)
            .int("collect_rate", self.rate);
    }
}

/// Watch/read progress (category 4)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMemo {
    pub episode_name: Option<String>,
    pub vols_total: Option<Total>,
    pub subject_name: Option<String>,
    pub eps_update: Option<u32>,
    pub vols_update: Option<u32>,
    pub eps_total: Option<Total>,
    pub episode_sort: Option<u32>,
    pub episode_id: Option<u32>,
    pub subject_id: Option<u32>,
    pub subject_type: Option<u8>,
}

impl MemoSchema for ProgressMemo {
    const NAME: &'static str = "progress";
    const EXPECTED: &'static [&'static str] = &["subject_name", "subject_id", "subject_type_id"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            episode_name: f.string("ep_name"),
            vols_total: Total::read(f, "vols_total"),
            subject_name: f.string("subject_name"),
            eps_update: f.int("eps_update"),
            vols_update: f.int("vols_update"),
            eps_total: Total::read(f, "eps_total"),
            episode_sort: f.int("ep_sort"),
            episode_id: f.int("ep_id"),
            subject_id: f.int("subject_id"),
            subject_type: f.int("subject_type_id"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("ep_name", &self.episode_name);
        write_total(w, "vols_total", self.vols_total);
        w.str("subject_name", &self.subject_name)
            .int_text("eps_update", self.eps_update)
            .int_text("vols_update", self.vols_update);
        write_total(w, "eps_total", self.eps_total);
        w.int_text("ep_sort", self.episode_sort)
            .int_text("ep_id", self.episode_id)
            .int_text("subject_id", self.subject_id)
            .int_text("subject_type_id", self.subject_type);
    }
}

/// Edited status text (5, 2)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SayEditMemo {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl MemoSchema for SayEditMemo {
    const NAME: &'static str = "say_edit";
    const EXPECTED: &'static [&'static str] = &["before", "after"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            before: f.string("before"),
            after: f.string("after"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("before", &self.before).str("after", &self.after);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogMemo {
    pub entry_title: Option<String>,
    pub entry_desc: Option<String>,
    pub entry_id: Option<u32>,
}

impl MemoSchema for BlogMemo {
    const NAME: &'static str = "blog";
    const EXPECTED: &'static [&'static str] = &["entry_title", "entry_id"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            entry_title: f.string("entry_title"),
            entry_desc: f.string("entry_desc"),
            entry_id: f.int("entry_id"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("entry_title", &self.entry_title)
            .str("entry_desc", &self.entry_desc)
            .int("entry_id", self.entry_id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMemo {
    pub index_id: Option<String>,
    pub index_title: Option<String>,
    pub index_desc: Option<String>,
}

impl MemoSchema for IndexMemo {
    const NAME: &'static str = "index";
    const EXPECTED: &'static [&'static str] = &["idx_id", "idx_title"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            index_id: f.string("idx_id"),
            index_title: f.string("idx_title"),
            index_desc: f.string("idx_desc"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("idx_id", &self.index_id)
            .str("idx_title", &self.index_title)
            .str("idx_desc", &self.index_desc);
    }
}

/// Character or person (category 8)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonoMemo {
    pub name: Option<String>,
    pub cat: Option<u32>,
    pub id: Option<u32>,
}

impl MemoSchema for MonoMemo {
    const NAME: &'static str = "mono";
    const EXPECTED: &'static [&'static str] = &["name", "cat", "id"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            name: f.string("name"),
            cat: f.int("cat"),
            id: f.int("id"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("name", &self.name).int("cat", self.cat).int("id", self.id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoujinMemo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
}

impl MemoSchema for DoujinMemo {
    const NAME: &'static str = "doujin";
    const EXPECTED: &'static [&'static str] = &["id", "name", "title"];

    fn read(f: &Fields<'_>) -> Self {
        Self {
            id: f.string("id"),
            name: f.string("name"),
            title: f.string("title"),
        }
    }

    fn write(&self, w: &mut FieldWriter) {
        w.str("id", &self.id).str("name", &self.name).str("title", &self.title);
    }
}

/// Decoded memo, one case per schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "memo", rename_all = "snake_case")]
pub enum MemoVariant {
    Relation(RelationMemo),
    Group(GroupMemo),
    Wiki(WikiMemo),
    Subject(SubjectMemo),
    Progress(ProgressMemo),
    /// Raw status text
    Say(String),
    SayEdit(SayEditMemo),
    Blog(BlogMemo),
    Index(IndexMemo),
    Mono(MonoMemo),
    Doujin(DoujinMemo),
}

fn missing<T: MemoSchema>(memo: &T) -> Vec<&'static str> {
    let mut w = FieldWriter::new();
    memo.write(&mut w);
    let value = w.finish();
    T::EXPECTED
        .iter()
        .copied()
        .filter(|name| value.get(name).is_none())
        .collect()
}

fn to_value<T: MemoSchema>(memo: &T) -> Value {
    let mut w = FieldWriter::new();
    memo.write(&mut w);
    w.finish()
}

impl MemoVariant {
    pub fn kind(&self) -> MemoKind {
        match self {
            MemoVariant::Relation(_) => MemoKind::Relation,
            MemoVariant::Group(_) => MemoKind::Group,
            MemoVariant::Wiki(_) => MemoKind::Wiki,
            MemoVariant::Subject(_) => MemoKind::Subject,
            MemoVariant::Progress(_) => MemoKind::Progress,
            MemoVariant::Say(_) => MemoKind::Say,
            MemoVariant::SayEdit(_) => MemoKind::SayEdit,
            MemoVariant::Blog(_) => MemoKind::Blog,
            MemoVariant::Index(_) => MemoKind::Index,
            MemoVariant::Mono(_) => MemoKind::Mono,
            MemoVariant::Doujin(_) => MemoKind::Doujin,
        }
    }

    pub fn default_discriminant(&self) -> Discriminant {
        self.kind().default_discriminant()
    }

    /// Expected fields this memo does not carry (always empty for `Say`)
    pub fn missing_fields(&self) -> Vec<&'static str> {
        match self {
            MemoVariant::Relation(m) => missing(m),
            MemoVariant::Group(m) => missing(m),
            MemoVariant::Wiki(m) => missing(m),
            MemoVariant::Subject(m) => missing(m),
            MemoVariant::Progress(m) => missing(m),
            MemoVariant::Say(_) => Vec::new(),
            MemoVariant::SayEdit(m) => missing(m),
            MemoVariant::Blog(m) => missing(m),
            MemoVariant::Index(m) => missing(m),
            MemoVariant::Mono(m) => missing(m),
            MemoVariant::Doujin(m) => missing(m),
        }
    }

    /// Key of this memo inside a batch map: the id of the object it is about
    pub fn batch_key(&self) -> Option<String> {
        match self {
            MemoVariant::Relation(m) => m.user_id.clone(),
            MemoVariant::Group(m) => m.group_id.clone(),
            MemoVariant::Wiki(m) => m.subject_id.map(|id| id.to_string()),
            MemoVariant::Subject(m) => m.subject_id.map(|id| id.to_string()),
            MemoVariant::Progress(m) => m.subject_id.map(|id| id.to_string()),
            MemoVariant::Say(_) | MemoVariant::SayEdit(_) => None,
            MemoVariant::Blog(m) => m.entry_id.map(|id| id.to_string()),
            MemoVariant::Index(m) => m.index_id.clone(),
            MemoVariant::Mono(m) => m.id.map(|id| id.to_string()),
            MemoVariant::Doujin(m) => m.id.clone(),
        }
    }

    /// Grammar value of this memo; `None` for raw-text `Say`
    pub(crate) fn to_value(&self) -> Option<Value> {
        let value = match self {
            MemoVariant::Relation(m) => to_value(m),
            MemoVariant::Group(m) => to_value(m),
            MemoVariant::Wiki(m) => to_value(m),
            MemoVariant::Subject(m) => to_value(m),
            MemoVariant::Progress(m) => to_value(m),
            MemoVariant::Say(_) => return None,
            MemoVariant::SayEdit(m) => to_value(m),
            MemoVariant::Blog(m) => to_value(m),
            MemoVariant::Index(m) => to_value(m),
            MemoVariant::Mono(m) => to_value(m),
            MemoVariant::Doujin(m) => to_value(m),
        };
        Some(value)
    }

    /// Build a memo of `kind` from an already decoded grammar value
    pub(crate) fn from_value(kind: MemoKind, value: &Value) -> Result<Self, CodecError> {
        let fields = || Fields::new(value, kind.name());
        let memo = match kind {
            MemoKind::Relation => MemoVariant::Relation(RelationMemo::read(&fields()?)),
            MemoKind::Group => MemoVariant::Group(GroupMemo::read(&fields()?)),
            MemoKind::Wiki => MemoVariant::Wiki(WikiMemo::read(&fields()?)),
            MemoKind::Subject => MemoVariant::Subject(SubjectMemo::read(&fields()?)),
            MemoKind::Progress => MemoVariant::Progress(ProgressMemo::read(&fields()?)),
            MemoKind::Say => match value {
                Value::Str(s) => MemoVariant::Say(s.clone()),
                other => {
                    return Err(CodecError::UnexpectedShape(format!(
                        "say memo is a {}, expected string",
                        other.kind()
                    )))
                }
            },
            MemoKind::SayEdit => MemoVariant::SayEdit(SayEditMemo::read(&fields()?)),
            MemoKind::Blog => MemoVariant::Blog(BlogMemo::read(&fields()?)),
            MemoKind::Index => MemoVariant::Index(IndexMemo::read(&fields()?)),
            MemoKind::Mono => MemoVariant::Mono(MonoMemo::read(&fields()?)),
            MemoKind::Doujin => MemoVariant::Doujin(DoujinMemo::read(&fields()?)),
        };
        Ok(memo)
    }

    fn schema_name(&self) -> &'static str {
        match self {
            MemoVariant::Relation(_) => RelationMemo::NAME,
            MemoVariant::Group(_) => GroupMemo::NAME,
            MemoVariant::Wiki(_) => WikiMemo::NAME,
            MemoVariant::Subject(_) => SubjectMemo::NAME,
            MemoVariant::Progress(_) => ProgressMemo::NAME,
            MemoVariant::Say(_) => "say",
            MemoVariant::SayEdit(_) => SayEditMemo::NAME,
            MemoVariant::Blog(_) => BlogMemo::NAME,
            MemoVariant::Index(_) => IndexMemo::NAME,
            MemoVariant::Mono(_) => MonoMemo::NAME,
            MemoVariant::Doujin(_) => DoujinMemo::NAME,
        }
    }
}

/// Decode a memo blob under the given discriminant
///
/// Memos lacking expected fields decode anyway (historical rows are often
/// partial); use [`decode_memo_strict`] to reject them.
pub fn decode_memo(discriminant: Discriminant, bytes: &[u8]) -> Result<MemoVariant, CodecError> {
    let kind = discriminant.resolve()?;
    let memo = if kind == MemoKind::Say {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            CodecError::malformed(e.valid_up_to(), "say memo is not valid UTF-8")
        })?;
        MemoVariant::Say(text.to_string())
    } else {
        MemoVariant::from_value(kind, &legacy::decode(bytes)?)?
    };

    let missing = memo.missing_fields();
    if !missing.is_empty() {
        debug!(
            "Partial {} memo {}: missing {}",
            memo.schema_name(),
            discriminant,
            missing.join(", ")
        );
    }
    Ok(memo)
}

/// Like [`decode_memo`], but a memo without all expected fields is an error
pub fn decode_memo_strict(
    discriminant: Discriminant,
    bytes: &[u8],
) -> Result<MemoVariant, CodecError> {
    let memo = decode_memo(discriminant, bytes)?;
    let missing = memo.missing_fields();
    if missing.is_empty() {
        Ok(memo)
    } else {
        Err(CodecError::IncompleteVariant {
            variant: memo.schema_name(),
            missing,
        })
    }
}

pub fn encode_memo(memo: &MemoVariant) -> Result<Vec<u8>, CodecError> {
    match memo {
        MemoVariant::Say(text) => Ok(text.as_bytes().to_vec()),
        other => other
            .to_value()
            .map(|v| legacy::encode(&v))
            .ok_or_else(|| CodecError::UnexpectedShape("memo has no grammar form".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject_memo() -> SubjectMemo {
        SubjectMemo {
            subject_id: Some(100),
            subject_type: Some(2),
            subject_name: Some("Cowboy Bebop".into()),
            subject_name_cn: Some("星际牛仔".into()),
            series: Some(false),
            comment: None,
            rate: Some(9),
        }
    }

    #[test]
    fn test_subject_memo_wire_shape() {
        let bytes = encode_memo(&MemoVariant::Subject(subject_memo())).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(
            "a:6:{s:10:\"subject_id\";s:3:\"100\";s:15:\"subject_type_id\";s:1:\"2\";"
        ));
        assert!(text.contains("s:14:\"subject_series\";s:1:\"0\";"));
        assert!(text.ends_with("s:12:\"collect_rate\";i:9;}"));
        assert!(!text.contains("collect_comment"));
    }

    #[test]
    fn test_subject_memo_accepts_numbers_either_way() {
        let native = b"a:2:{s:10:\"subject_id\";i:100;s:15:\"subject_type_id\";i:2;}";
        let texty = b"a:2:{s:10:\"subject_id\";s:3:\"100\";s:15:\"subject_type_id\";s:1:\"2\";}";
        let d = Discriminant::new(3, 2);
        assert_eq!(decode_memo(d, native).unwrap(), decode_memo(d, texty).unwrap());
    }

    #[test]
    fn test_say_is_raw_text() {
        let d = Discriminant::new(5, 1);
        let raw = "a:1:{not grammar at all";
        assert_eq!(decode_memo(d, raw.as_bytes()).unwrap(), MemoVariant::Say(raw.into()));
        assert_eq!(encode_memo(&MemoVariant::Say(raw.into())).unwrap(), raw.as_bytes());
    }

    #[test]
    fn test_say_edit_is_grammar() {
        let d = Discriminant::new(5, 2);
        let bytes = b"a:2:{s:6:\"before\";s:1:\"a\";s:5:\"after\";s:1:\"b\";}";
        assert_eq!(
            decode_memo(d, bytes).unwrap(),
            MemoVariant::SayEdit(SayEditMemo {
                before: Some("a".into()),
                after: Some("b".into()),
            })
        );
        assert!(matches!(
            decode_memo(d, b"plain text"),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn test_progress_unknown_totals() {
        let memo = MemoVariant::Progress(ProgressMemo {
            eps_total: Some(Total::Unknown),
            vols_total: Some(Total::Known(3)),
            subject_id: Some(5),
            ..Default::default()
        });
        let bytes = encode_memo(&memo).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("s:9:\"eps_total\";s:2:\"??\";"));
        assert!(text.contains("s:10:\"vols_total\";s:1:\"3\";"));
        assert_eq!(decode_memo(Discriminant::new(4, 0), &bytes).unwrap(), memo);
    }

    #[test]
    fn test_empty_string_field_is_kept() {
        let memo = MemoVariant::Blog(BlogMemo {
            entry_title: Some(String::new()),
            ..Default::default()
        });
        let bytes = encode_memo(&memo).unwrap();
        assert_eq!(bytes, b"a:1:{s:11:\"entry_title\";s:0:\"\";}");
    }

    #[test]
    fn test_partial_memo_tolerated_but_strict_rejects() {
        let d = Discriminant::new(8, 1);
        let bytes = b"a:1:{s:4:\"name\";s:3:\"Rei\";}";
        let memo = decode_memo(d, bytes).unwrap();
        assert_eq!(memo.missing_fields(), vec!["cat", "id"]);
        assert_eq!(
            decode_memo_strict(d, bytes),
            Err(CodecError::IncompleteVariant {
                variant: "mono",
                missing: vec!["cat", "id"],
            })
        );
    }

    #[test]
    fn test_non_array_memo_is_unexpected_shape() {
        assert!(matches!(
            decode_memo(Discriminant::new(3, 0), b"i:5;"),
            Err(CodecError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_unknown_discriminant_never_guesses() {
        assert_eq!(
            decode_memo(Discriminant::new(1, 9), b"a:0:{}"),
            Err(CodecError::UnsupportedDiscriminant {
                category: 1,
                subtype: 9
            })
        );
    }

    #[test]
    fn test_batch_key() {
        assert_eq!(
            MemoVariant::Subject(subject_memo()).batch_key(),
            Some("100".to_string())
        );
        assert_eq!(MemoVariant::Say("x".into()).batch_key(), None);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(MemoVariant::Say("hi".into())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "say", "memo": "hi"}));
    }
}
