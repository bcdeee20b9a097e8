//! Exact-match terminology overrides.
//!
//! RFCs repeat a small amount of boilerplate (section headings, the RFC 2119
//! keyword paragraph, the IETF Trust copyright notice). These always get the
//! same hand-written translation, whatever the backend would have produced.

use std::collections::HashMap;

/// Immutable phrase -> translation table, matched on the whole string,
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: HashMap<String, String>,
}

impl RuleTable {
    /// Build a table; keys are normalized to lowercase.
    pub fn new<K, V>(rules: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The RFC boilerplate table for Simplified Chinese.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_RULES.iter().copied())
    }

    /// Return a copy with `extra` merged in; `extra` wins on conflicts.
    #[must_use]
    pub fn extend<K, V>(mut self, extra: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.rules.extend(
            extra
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into())),
        );
        self
    }

    /// Full-string, case-insensitive lookup.
    pub fn lookup(&self, phrase: &str) -> Option<&str> {
        if self.rules.is_empty() {
            return None;
        }
        self.rules.get(&phrase.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

const BUILTIN_RULES: &[(&str, &str)] = &[
    ("abstract", "摘要"),
    ("introduction", "介绍"),
    ("acknowledgement", "致谢"),
    ("acknowledgements", "致谢"),
    ("status of this memo", "本备忘录的状态"),
    ("copyright notice", "著作权"),
    ("table of contents", "目录"),
    ("conventions", "公约"),
    ("terminology", "术语"),
    ("discussion", "讨论"),
    ("references", "参考文献"),
    ("normative references", "引用文献"),
    ("informative references", "参考引用"),
    ("contributors", "贡献者"),
    ("where", "ただし|哪儿"),
    ("where:", "ただし：|哪儿："),
    ("assume:", "假设："),
    (
        "the key words \"must\", \"must not\", \"required\", \"shall\", \
         \"shall not\", \"should\", \"should not\", \"recommended\", \"may\", and \
         \"optional\" in this document are to be interpreted as described in rfc \
         2119 [rfc2119].",
        "关键字 \"MUST\", \"MUST NOT\", \"REQUIRED\", \"SHALL\", \"SHALL NOT\", \
         \"SHOULD\", \"SHOULD NOT\", \"RECOMMENDED\", \"MAY\", 和 \"OPTIONAL\" \
         应按照 rfc 2119 [rfc2119] 中的描述进行解释。",
    ),
    (
        "the key words \"must\", \"must not\", \"required\", \"shall\", \
         \"shall not\", \"should\", \"should not\", \"recommended\", \
         \"not recommended\", \"may\", and \"optional\" in this document are to be \
         interpreted as described in bcp 14 [rfc2119] [rfc8174] when, and only when, \
         they appear in all capitals, as shown here.",
        "关键字 \"MUST\", \"MUST NOT\", \"REQUIRED\", \"SHALL\", \"SHALL NOT\", \
         \"SHOULD\", \"SHOULD NOT\", \"RECOMMENDED\", \"MAY\", 和 \"OPTIONAL\" \
         当且仅当它们以所有大写字母出现时，应按照 bcp 14 [rfc2119] [rfc8174] 中的描述进\
         行解释，如此处所示。",
    ),
    (
        "this document is subject to bcp 78 and the ietf trust's legal provisions \
         relating to ietf documents (https://trustee.ietf.org/license-info) in \
         effect on the date of publication of this document. please review these \
         documents carefully, as they describe your rights and restrictions with \
         respect to this document. code components extracted from this document \
         must include simplified bsd license text as described in section 4.e of \
         the trust legal provisions and are provided without warranty as described \
         in the simplified bsd license.",
        "本文件受 bcp 78 和 ietf 信托关于 ietf 文件 \
         (https://trustee.ietf.org/license-info) 的法律规定的约束，在本文件发布之日\
         生效。请仔细阅读这些文件，因为它们描述了您对本文件的权利和限制。从本文档中提取的代码\
         组件必须包含信托法律条款第 4.e 节中所述的简化 bsd 许可文本，并且不提供如简化 bsd \
         许可中所述的保证。",
    ),
];
