//! QuickTime `mdta` metadata of the clip
//!
//! Layout read here (and produced by ffmpeg with `use_metadata_tags`):
//!
//! ```text
//! moov
//! └── meta
//!     ├── hdlr  handler type "mdta"
//!     ├── keys  [size, "mdta", key bytes]...
//!     └── ilst  [size, key index (1-based)] -> data [type, locale, value]
//! ```

use crate::error::{MediaError, MediaResult};

/// Well-known data type for UTF-8 values
const DATA_TYPE_UTF8: u32 = 1;

/// Container metadata entries of a clip, in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipMetadata {
    pub entries: Vec<(String, String)>,
}

impl ClipMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct Atom<'a> {
    kind: [u8; 4],
    body: &'a [u8],
}

/// Iterate sibling atoms of a buffer
fn atoms(mut buf: &[u8]) -> MediaResult<Vec<Atom<'_>>> {
    let mut out = Vec::new();
    while buf.len() >= 8 {
        let size32 = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64;
        let kind = [buf[4], buf[5], buf[6], buf[7]];
        let (header, size) = match size32 {
            0 => (8usize, buf.len() as u64),
            1 => {
                let large = buf
                    .get(8..16)
                    .ok_or_else(|| MediaError::metadata("Truncated 64-bit atom size"))?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(large);
                (16usize, u64::from_be_bytes(bytes))
            }
            n => (8usize, n),
        };
        if size < header as u64 || size > buf.len() as u64 {
            return Err(MediaError::metadata(format!(
                "Atom '{}' has invalid size {}",
                String::from_utf8_lossy(&kind),
                size
            )));
        }
        let size = size as usize;
        out.push(Atom {
            kind,
            body: &buf[header..size],
        });
        buf = &buf[size..];
    }
    Ok(out)
}

fn child<'a>(atoms: &[Atom<'a>], kind: &[u8; 4]) -> Option<Atom<'a>> {
    atoms.iter().copied().find(|a| &a.kind == kind)
}

fn be_u32(buf: &[u8], at: usize) -> MediaResult<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| MediaError::metadata("Truncated metadata atom"))
}

/// Children of a `meta` atom, with or without the full-box version field
fn meta_children(meta: Atom<'_>) -> MediaResult<Vec<Atom<'_>>> {
    let body = if meta.body.get(4..8) == Some(&b"hdlr"[..]) {
        meta.body
    } else {
        meta.body
            .get(4..)
            .ok_or_else(|| MediaError::metadata("Truncated meta atom"))?
    };
    atoms(body)
}

/// Read the `mdta` metadata of a QuickTime file. Empty when none is present.
pub fn read(bytes: &[u8]) -> MediaResult<ClipMetadata> {
    let top = atoms(bytes)?;
    let Some(moov) = child(&top, b"moov") else {
        return Err(MediaError::metadata("No moov atom in clip"));
    };
    let moov_children = atoms(moov.body)?;

    let meta = child(&moov_children, b"meta").or_else(|| {
        child(&moov_children, b"udta")
            .and_then(|udta| atoms(udta.body).ok())
            .and_then(|udta_children| child(&udta_children, b"meta"))
    });
    let Some(meta) = meta else {
        return Ok(ClipMetadata::default());
    };

    let children = meta_children(meta)?;
    let is_mdta = child(&children, b"hdlr")
        .map(|hdlr| hdlr.body.get(8..12) == Some(&b"mdta"[..]))
        .unwrap_or(false);
    let (Some(keys), Some(ilst)) = (child(&children, b"keys"), child(&children, b"ilst")) else {
        return Ok(ClipMetadata::default());
    };
    if !is_mdta {
        return Ok(ClipMetadata::default());
    }

    let count = be_u32(keys.body, 4)? as usize;
    let mut names = Vec::with_capacity(count);
    let mut pos = 8;
    for _ in 0..count {
        let size = be_u32(keys.body, pos)? as usize;
        let name = keys
            .body
            .get(pos + 8..pos + size)
            .filter(|_| size >= 8)
            .ok_or_else(|| MediaError::metadata("Truncated keys entry"))?;
        names.push(String::from_utf8_lossy(name).into_owned());
        pos += size;
    }

    let mut metadata = ClipMetadata::default();
    for item in atoms(ilst.body)? {
        let index = u32::from_be_bytes(item.kind) as usize;
        let Some(name) = index.checked_sub(1).and_then(|i| names.get(i)) else {
            continue;
        };
        for data in atoms(item.body)?.into_iter().filter(|a| &a.kind == b"data") {
            let value = data
                .body
                .get(8..)
                .ok_or_else(|| MediaError::metadata("Truncated data atom"))?;
            metadata
                .entries
                .push((name.clone(), String::from_utf8_lossy(value).into_owned()));
        }
    }
    Ok(metadata)
}

/// Check for a leading QuickTime/ISO atom
pub fn looks_like_quicktime(bytes: &[u8]) -> bool {
    matches!(
        bytes.get(4..8),
        Some(b"ftyp") | Some(b"moov") | Some(b"mdat") | Some(b"wide") | Some(b"free")
    )
}

fn atom(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

/// Encode a `meta` atom holding `entries` as UTF-8 `mdta` items
pub fn encode_meta(entries: &[(String, String)]) -> Vec<u8> {
    let mut hdlr = vec![0u8; 8];
    hdlr.extend_from_slice(b"mdta");
    hdlr.extend_from_slice(&[0u8; 12]);
    hdlr.push(0);

    let mut keys = vec![0u8; 4];
    keys.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (key, _) in entries {
        keys.extend_from_slice(&((key.len() + 8) as u32).to_be_bytes());
        keys.extend_from_slice(b"mdta");
        keys.extend_from_slice(key.as_bytes());
    }

    let mut ilst = Vec::new();
    for (index, (_, value)) in entries.iter().enumerate() {
        let mut data = Vec::with_capacity(value.len() + 8);
        data.extend_from_slice(&DATA_TYPE_UTF8.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(value.as_bytes());
        let key_index = (index as u32 + 1).to_be_bytes();
        ilst.extend_from_slice(&atom(&key_index, &atom(b"data", &data)));
    }

    let mut body = vec![0u8; 4];
    body.extend_from_slice(&atom(b"hdlr", &hdlr));
    body.extend_from_slice(&atom(b"keys", &keys));
    body.extend_from_slice(&atom(b"ilst", &ilst));
    atom(b"meta", &body)
}

/// Minimal movie header carrying only metadata. Enough for the metadata
/// reader, not playable.
pub fn encode_movie_header(entries: &[(String, String)]) -> Vec<u8> {
    let mut ftyp = Vec::new();
    ftyp.extend_from_slice(b"qt  ");
    ftyp.extend_from_slice(&0x0200u32.to_be_bytes());
    ftyp.extend_from_slice(b"qt  ");

    let mut out = atom(b"ftyp", &ftyp);
    out.extend_from_slice(&atom(b"moov", &encode_meta(entries)));
    out
}
