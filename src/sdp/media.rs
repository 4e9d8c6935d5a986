use std::fmt;
use std::str::FromStr;

use crate::sdp::{Attribute, SdpError};

/// Media type in an `m=` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    Application,
    Other(String),
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
            Self::Application => f.write_str("application"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MediaKind {
    fn from(s: &str) -> Self {
        match s {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "application" => Self::Application,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::SendRecv => "sendrecv",
            Self::SendOnly => "sendonly",
            Self::RecvOnly => "recvonly",
            Self::Inactive => "inactive",
        }
    }

    fn from_attr(key: &str) -> Option<Self> {
        match key {
            "sendrecv" => Some(Self::SendRecv),
            "sendonly" => Some(Self::SendOnly),
            "recvonly" => Some(Self::RecvOnly),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    /// Whether the side that wrote this section sends media.
    pub fn sends(self) -> bool {
        matches!(self, Self::SendRecv | Self::SendOnly)
    }
}

impl FromStr for Direction {
    type Err = SdpError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_attr(s).ok_or(SdpError::Invalid("direction"))
    }
}

/// One `m=` section. Well-known attributes are lifted into fields; anything
/// else is kept in `attrs` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSection {
    pub kind: MediaKind,
    pub port: u16,
    pub proto: String,
    pub fmts: Vec<String>,
    pub mid: Option<String>,
    pub direction: Direction,
    /// `a=msid:<stream id> <track id>`
    pub msid: Option<(String, String)>,
    /// `a=label:` free-form track label.
    pub label: Option<String>,
    pub attrs: Vec<Attribute>,
}

impl MediaSection {
    pub fn new(kind: MediaKind, fmts: Vec<String>) -> Self {
        Self {
            kind,
            port: 9,
            proto: "UDP/TLS/RTP/SAVPF".into(),
            fmts,
            mid: None,
            direction: Direction::SendRecv,
            msid: None,
            label: None,
            attrs: Vec::new(),
        }
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.msid.as_ref().map(|(s, _)| s.as_str())
    }

    pub fn track_id(&self) -> Option<&str> {
        self.msid.as_ref().map(|(_, t)| t.as_str())
    }

    /// Parse the part after `m=`.
    pub(crate) fn parse_m_line(rest: &str) -> Result<Self, SdpError> {
        let mut p = rest.split_whitespace();
        let kind = MediaKind::from(p.next().ok_or(SdpError::Invalid("m="))?);
        let port_tok = p.next().ok_or(SdpError::Invalid("m= port"))?;
        // port ranges (`port/num`) are accepted; the count is dropped
        let port = port_tok
            .split_once('/')
            .map_or(port_tok, |(base, _)| base)
            .parse::<u16>()?;
        let proto = p.next().ok_or(SdpError::Invalid("m= proto"))?.to_owned();
        let fmts = p.map(str::to_owned).collect();
        Ok(Self {
            port,
            proto,
            ..Self::new(kind, fmts)
        })
    }

    /// Apply one media-level `a=` line.
    pub(crate) fn apply_attr(&mut self, attr: Attribute) -> Result<(), SdpError> {
        if let Some(dir) = Direction::from_attr(attr.key()) {
            self.direction = dir;
            return Ok(());
        }
        match (attr.key(), attr.value()) {
            ("mid", Some(v)) => self.mid = Some(v.to_owned()),
            ("label", Some(v)) => self.label = Some(v.to_owned()),
            ("msid", Some(v)) => {
                let (stream, track) = v.split_once(' ').ok_or(SdpError::Invalid("a=msid"))?;
                self.msid = Some((stream.to_owned(), track.to_owned()));
            }
            _ => self.attrs.push(attr),
        }
        Ok(())
    }
}

impl fmt::Display for MediaSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} {} {}", self.kind, self.port, self.proto)?;
        for fmt_tok in &self.fmts {
            write!(f, " {fmt_tok}")?;
        }
        f.write_str("\r\n")?;
        if let Some(mid) = &self.mid {
            write!(f, "a=mid:{mid}\r\n")?;
        }
        write!(f, "a={}\r\n", self.direction.as_str())?;
        if let Some((stream, track)) = &self.msid {
            write!(f, "a=msid:{stream} {track}\r\n")?;
        }
        if let Some(label) = &self.label {
            write!(f, "a=label:{label}\r\n")?;
        }
        for a in &self.attrs {
            write!(f, "{a}\r\n")?;
        }
        Ok(())
    }
}
