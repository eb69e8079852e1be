//! CSP directive names and their merge classification.
//!
//! The set of directives is closed: anything not listed here is rejected by
//! the schema and ignored by the merge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A recognized CSP directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Directive {
    BaseUri,
    ChildSrc,
    ConnectSrc,
    DefaultSrc,
    FontSrc,
    FormAction,
    FrameAncestors,
    FrameSrc,
    ImgSrc,
    MediaSrc,
    ObjectSrc,
    PluginTypes,
    ReportUri,
    Sandbox,
    ScriptSrc,
    StyleSrc,
}

/// How a directive's values combine across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeClass {
    /// Values from every document are unioned.
    Mergeable,
    /// Documents must agree; the first non-empty value wins.
    Conflicting,
}

/// The JSON shape a directive's value must take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Array of source expressions, or exactly `['none']`.
    SourceList,
    /// Single string: URI or hostname.
    UriOrHostname,
    /// Single string: URI.
    Uri,
    /// Array of `type/subtype` media types.
    MediaTypes,
    /// Array of sandbox keywords.
    SandboxFlags,
}

impl Directive {
    /// Every directive, in lexicographic order of its name.
    pub const ALL: [Self; 16] = [
        Self::BaseUri,
        Self::ChildSrc,
        Self::ConnectSrc,
        Self::DefaultSrc,
        Self::FontSrc,
        Self::FormAction,
        Self::FrameAncestors,
        Self::FrameSrc,
        Self::ImgSrc,
        Self::MediaSrc,
        Self::ObjectSrc,
        Self::PluginTypes,
        Self::ReportUri,
        Self::Sandbox,
        Self::ScriptSrc,
        Self::StyleSrc,
    ];

    /// The directive name as it appears in documents and headers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUri => "base-uri",
            Self::ChildSrc => "child-src",
            Self::ConnectSrc => "connect-src",
            Self::DefaultSrc => "default-src",
            Self::FontSrc => "font-src",
            Self::FormAction => "form-action",
            Self::FrameAncestors => "frame-ancestors",
            Self::FrameSrc => "frame-src",
            Self::ImgSrc => "img-src",
            Self::MediaSrc => "media-src",
            Self::ObjectSrc => "object-src",
            Self::PluginTypes => "plugin-types",
            Self::ReportUri => "report-uri",
            Self::Sandbox => "sandbox",
            Self::ScriptSrc => "script-src",
            Self::StyleSrc => "style-src",
        }
    }

    /// Looks up a directive by name. Names are case-sensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.as_str() == name)
    }

    /// The value shape the schema enforces for this directive.
    #[must_use]
    pub const fn shape(self) -> ValueShape {
        match self {
            Self::BaseUri => ValueShape::UriOrHostname,
            Self::ReportUri => ValueShape::Uri,
            Self::PluginTypes => ValueShape::MediaTypes,
            Self::Sandbox => ValueShape::SandboxFlags,
            Self::ChildSrc
            | Self::ConnectSrc
            | Self::DefaultSrc
            | Self::FontSrc
            | Self::FormAction
            | Self::FrameAncestors
            | Self::FrameSrc
            | Self::ImgSrc
            | Self::MediaSrc
            | Self::ObjectSrc
            | Self::ScriptSrc
            | Self::StyleSrc => ValueShape::SourceList,
        }
    }

    /// Merge classification; `None` for schema-only directives that the
    /// merge drops.
    #[must_use]
    pub const fn merge_class(self) -> Option<MergeClass> {
        match self {
            Self::BaseUri | Self::ReportUri => Some(MergeClass::Conflicting),
            Self::PluginTypes | Self::Sandbox => None,
            _ => Some(MergeClass::Mergeable),
        }
    }

    /// Returns true if values for this directive are unioned on merge.
    #[must_use]
    pub const fn is_mergeable(self) -> bool {
        matches!(self.merge_class(), Some(MergeClass::Mergeable))
    }

    /// Returns true if documents must agree on this directive.
    #[must_use]
    pub const fn is_conflicting(self) -> bool {
        matches!(self.merge_class(), Some(MergeClass::Conflicting))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Directive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown directive: {s}"))
    }
}
