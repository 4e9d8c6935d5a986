use std::fmt;
use std::str::FromStr;

use crate::sdp::{Attribute, MediaSection, SdpError};

/// A session description as exchanged in offers and answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub origin_addr: String,
    pub session_name: String,
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    /// mids listed in `a=group:BUNDLE`
    pub bundle: Vec<String>,
    pub attrs: Vec<Attribute>,
    pub media: Vec<MediaSection>,
}

impl SessionDescription {
    pub fn new(session_id: u64, session_version: u64) -> Self {
        Self {
            username: "-".into(),
            session_id,
            session_version,
            origin_addr: "127.0.0.1".into(),
            session_name: "-".into(),
            ice_ufrag: None,
            ice_pwd: None,
            bundle: Vec::new(),
            attrs: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn media_by_mid(&self, mid: &str) -> Option<&MediaSection> {
        self.media.iter().find(|m| m.mid.as_deref() == Some(mid))
    }

    fn apply_session_attr(&mut self, attr: Attribute) {
        match (attr.key(), attr.value()) {
            ("ice-ufrag", Some(v)) => self.ice_ufrag = Some(v.to_owned()),
            ("ice-pwd", Some(v)) => self.ice_pwd = Some(v.to_owned()),
            ("group", Some(v)) if v.starts_with("BUNDLE") => {
                self.bundle = v.split_whitespace().skip(1).map(str::to_owned).collect();
            }
            _ => self.attrs.push(attr),
        }
    }
}

impl FromStr for SessionDescription {
    type Err = SdpError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut saw_version = false;
        let mut origin: Option<(String, u64, u64, String)> = None;
        let mut desc = Self::new(0, 0);

        for raw in input.split('\n') {
            let line = raw.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let Some((prefix, rest)) = line.split_once('=') else {
                return Err(SdpError::Invalid("line without '='"));
            };
            match prefix {
                "v" => {
                    if rest != "0" {
                        return Err(SdpError::Invalid("v="));
                    }
                    saw_version = true;
                }
                "o" => {
                    let parts: Vec<_> = rest.split_whitespace().collect();
                    if parts.len() != 6 {
                        return Err(SdpError::Invalid("o="));
                    }
                    origin = Some((
                        parts[0].to_owned(),
                        parts[1].parse::<u64>()?,
                        parts[2].parse::<u64>()?,
                        parts[5].to_owned(),
                    ));
                }
                "s" => desc.session_name = rest.to_owned(),
                "m" => desc.media.push(MediaSection::parse_m_line(rest)?),
                "a" => {
                    let attr = Attribute::parse(rest);
                    match desc.media.last_mut() {
                        Some(m) => m.apply_attr(attr)?,
                        None => desc.apply_session_attr(attr),
                    }
                }
                // t=, c= and friends carry nothing we negotiate on
                _ => {}
            }
        }

        if !saw_version {
            return Err(SdpError::Missing("v="));
        }
        let (username, session_id, session_version, origin_addr) =
            origin.ok_or(SdpError::Missing("o="))?;
        desc.username = username;
        desc.session_id = session_id;
        desc.session_version = session_version;
        desc.origin_addr = origin_addr;
        Ok(desc)
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("v=0\r\n")?;
        write!(
            f,
            "o={} {} {} IN IP4 {}\r\n",
            self.username, self.session_id, self.session_version, self.origin_addr
        )?;
        write!(f, "s={}\r\n", self.session_name)?;
        f.write_str("t=0 0\r\n")?;
        if !self.bundle.is_empty() {
            write!(f, "a=group:BUNDLE {}\r\n", self.bundle.join(" "))?;
        }
        if let Some(ufrag) = &self.ice_ufrag {
            write!(f, "a=ice-ufrag:{ufrag}\r\n")?;
        }
        if let Some(pwd) = &self.ice_pwd {
            write!(f, "a=ice-pwd:{pwd}\r\n")?;
        }
        for a in &self.attrs {
            write!(f, "{a}\r\n")?;
        }
        for m in &self.media {
            write!(f, "{m}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::sdp::{Direction, MediaKind};

    const BROWSER_LIKE: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
a=msid-semantic: WMS stream-a\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:abcd\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=msid:stream-a track-a\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:1\r\n\
a=recvonly\r\n";

    #[test]
    fn parses_sections_and_lifted_attributes() {
        let d: SessionDescription = BROWSER_LIKE.parse().unwrap();
        assert_eq!(d.session_id, 4611731400430051336);
        assert_eq!(d.session_version, 2);
        assert_eq!(d.bundle, vec!["0", "1"]);
        assert_eq!(d.media.len(), 2);

        let audio = d.media_by_mid("0").unwrap();
        assert_eq!(audio.kind, MediaKind::Audio);
        assert_eq!(audio.stream_id(), Some("stream-a"));
        assert_eq!(audio.track_id(), Some("track-a"));
        assert!(audio.attrs.iter().any(|a| a.key() == "rtpmap"));

        let video = d.media_by_mid("1").unwrap();
        assert_eq!(video.direction, Direction::RecvOnly);
        assert!(video.msid.is_none());
    }

    #[test]
    fn written_form_parses_back_to_same_model() {
        let mut d = SessionDescription::new(7, 1);
        d.ice_ufrag = Some("u".into());
        d.ice_pwd = Some("p".into());
        d.bundle = vec!["0".into()];
        let mut m = MediaSection::new(MediaKind::Video, vec!["96".into()]);
        m.mid = Some("0".into());
        m.msid = Some(("screen-1".into(), "t1".into()));
        m.label = Some("Screen 1".into());
        d.media.push(m);

        let text = d.to_string();
        assert!(text.contains("a=msid:screen-1 t1\r\n"));
        assert_eq!(text.parse::<SessionDescription>().unwrap(), d);
    }

    #[test]
    fn rejects_missing_header_lines() {
        assert_eq!(
            "s=-\r\n".parse::<SessionDescription>(),
            Err(SdpError::Missing("v="))
        );
        assert_eq!(
            "v=0\r\ns=-\r\n".parse::<SessionDescription>(),
            Err(SdpError::Missing("o="))
        );
        assert!("v=0\r\no=- x 1 IN IP4 h\r\n".parse::<SessionDescription>().is_err());
    }
}
