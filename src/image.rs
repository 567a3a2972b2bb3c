//! Image references and byte-level format detection

use crate::error::{ProjectionError, ProjectionResult};
use std::fmt;
use std::fs;
use std::io::{self, Chain, Cursor, Read};
use std::path::PathBuf;

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Image container formats the document writers know how to embed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Jpg,
    Bmp,
    Png,
}

impl ImageFormat {
    /// Map a file extension to a format; unknown extensions are treated as JPEG
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "gif" => ImageFormat::Gif,
            "bmp" => ImageFormat::Bmp,
            "png" => ImageFormat::Png,
            _ => ImageFormat::Jpg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Gif => "gif",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png => "png",
        }
    }
}

/// Detect the image format from magic bytes, defaulting to JPEG
///
/// Signatures are only compared when the buffer is long enough to hold them.
pub fn sniff_image_format(bytes: &[u8]) -> ImageFormat {
    if let [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] = bytes {
        ImageFormat::Gif
    } else if bytes.get(6..10) == Some(b"JFIF".as_slice()) {
        ImageFormat::Jpg
    } else if bytes.starts_with(b"BM") {
        ImageFormat::Bmp
    } else if bytes.get(1..4) == Some(b"PNG".as_slice()) {
        ImageFormat::Png
    } else {
        ImageFormat::Jpg
    }
}

/// Read the first bytes of `reader` and report whether they are a UTF-8 byte order mark
///
/// Up to three bytes are consumed, across as many reads as the source needs.
/// Inputs shorter than three bytes never carry a BOM.
pub fn has_byte_order_mark<R: Read + ?Sized>(reader: &mut R) -> io::Result<bool> {
    let mut head = [0u8; 3];
    let len = read_head(reader, &mut head)?;
    Ok(head[..len] == UTF8_BOM)
}

/// Strip a leading UTF-8 byte order mark
///
/// Returns whether a mark was found, and a reader over everything after it.
/// Bytes read while looking for the mark are replayed when there was none.
pub fn skip_byte_order_mark<R: Read>(
    mut reader: R,
) -> io::Result<(bool, Chain<Cursor<Vec<u8>>, R>)> {
    let mut head = [0u8; 3];
    let len = read_head(&mut reader, &mut head)?;
    let found = head[..len] == UTF8_BOM;
    let replay = if found { Vec::new() } else { head[..len].to_vec() };
    Ok((found, Cursor::new(replay).chain(reader)))
}

/// Fill `buf` from `reader` until it is full or the input ends
fn read_head<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

//==============================================================================
// Image References
//==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Location handed to an [`ImageLoader`]
    Url(String),
    /// Inline image bytes
    Data(Vec<u8>),
}

/// Image placed into a cell or placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntity {
    pub source: ImageSource,
    pub width: u32,
    pub height: u32,
    pub rowspan: u32,
    pub colspan: u32,
}

impl ImageEntity {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(ImageSource::Url(url.into()))
    }

    pub fn from_data(data: Vec<u8>) -> Self {
        Self::new(ImageSource::Data(data))
    }

    fn new(source: ImageSource) -> Self {
        Self {
            source,
            width: 0,
            height: 0,
            rowspan: 1,
            colspan: 1,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_span(mut self, rowspan: u32, colspan: u32) -> Self {
        self.rowspan = rowspan;
        self.colspan = colspan;
        self
    }

    /// Image bytes and format; URL images take the format from their extension
    pub fn load(&self, loader: &dyn ImageLoader) -> ProjectionResult<(Vec<u8>, ImageFormat)> {
        match &self.source {
            ImageSource::Url(url) => {
                let bytes = loader.load(url)?;
                let ext = url.rsplit('.').next().unwrap_or_default();
                Ok((bytes, ImageFormat::from_extension(ext)))
            }
            ImageSource::Data(data) => Ok((data.clone(), sniff_image_format(data))),
        }
    }
}

impl fmt::Display for ImageEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ImageSource::Url(url) => write!(f, "image({url})"),
            ImageSource::Data(data) => write!(f, "image({} bytes)", data.len()),
        }
    }
}

/// Fetches image bytes for URL-backed images
pub trait ImageLoader {
    fn load(&self, location: &str) -> ProjectionResult<Vec<u8>>;
}

/// Loads images from the local filesystem, optionally relative to a base directory
#[derive(Debug, Clone, Default)]
pub struct FsImageLoader {
    base_dir: Option<PathBuf>,
}

impl FsImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, location: &str) -> ProjectionResult<Vec<u8>> {
        let path = match &self.base_dir {
            Some(base) => base.join(location),
            None => PathBuf::from(location),
        };
        fs::read(&path).map_err(|e| {
            ProjectionError::Export(format!("Failed to load image '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_sniff_png() {
        assert_eq!(sniff_image_format(&[0x89, 0x50, 0x4E, 0x47]), ImageFormat::Png);
        let mut full = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        full.extend_from_slice(&[0; 16]);
        assert_eq!(sniff_image_format(&full), ImageFormat::Png);
    }

    #[test]
    fn test_sniff_gif_jpg_bmp() {
        assert_eq!(sniff_image_format(b"GIF89a\x01\x00"), ImageFormat::Gif);
        assert_eq!(sniff_image_format(b"GIF87a"), ImageFormat::Gif);
        assert_eq!(
            sniff_image_format(b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00"),
            ImageFormat::Jpg
        );
        assert_eq!(sniff_image_format(b"BM\x36\x00\x00\x00"), ImageFormat::Bmp);
    }

    #[test]
    fn test_sniff_defaults_to_jpg() {
        assert_eq!(sniff_image_format(&[]), ImageFormat::Jpg);
        assert_eq!(sniff_image_format(&[0x00]), ImageFormat::Jpg);
        assert_eq!(sniff_image_format(b"GIF8"), ImageFormat::Jpg);
        assert_eq!(sniff_image_format(b"random bytes here"), ImageFormat::Jpg);
    }

    /// Hands out one byte per read, like a slow pipe
    struct OneByteReader<'a>(&'a [u8]);

    impl Read for OneByteReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((byte, rest)), Some(slot)) => {
                    *slot = *byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn test_byte_order_mark_is_consumed() {
        let mut reader = BufReader::new(&b"\xEF\xBB\xBFname,age\n"[..]);
        assert!(has_byte_order_mark(&mut reader).unwrap());

        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "name,age\n");
    }

    #[test]
    fn test_byte_order_mark_split_across_reads() {
        let mut reader = OneByteReader(b"\xEF\xBB\xBFabc");
        assert!(has_byte_order_mark(&mut reader).unwrap());

        let mut buffered = BufReader::new(OneByteReader(b"\xEF\xBB\xBFabc"));
        assert!(has_byte_order_mark(&mut buffered).unwrap());
    }

    #[test]
    fn test_skip_byte_order_mark() {
        let (found, mut rest) =
            skip_byte_order_mark(OneByteReader(b"\xEF\xBB\xBFabc")).unwrap();
        assert!(found);
        let mut text = String::new();
        rest.read_to_string(&mut text).unwrap();
        assert_eq!(text, "abc");
    }

    #[test]
    fn test_skip_replays_non_bom_bytes() {
        let (found, mut rest) = skip_byte_order_mark(OneByteReader(b"\xEFabcdef")).unwrap();
        assert!(!found);
        let mut bytes = Vec::new();
        rest.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"\xEFabcdef");

        let (found, mut rest) = skip_byte_order_mark(&b"ab"[..]).unwrap();
        assert!(!found);
        let mut text = String::new();
        rest.read_to_string(&mut text).unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_no_byte_order_mark() {
        assert!(!has_byte_order_mark(&mut &b"abc"[..]).unwrap());
        assert!(!has_byte_order_mark(&mut &b"\xEF\xBB"[..]).unwrap());
        assert!(!has_byte_order_mark(&mut &b""[..]).unwrap());
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ImageFormat::from_extension("PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_extension("jpeg"), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_extension("Gif"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_extension("bmp"), ImageFormat::Bmp);
        assert_eq!(ImageFormat::from_extension("tiff"), ImageFormat::Jpg);
    }

    #[test]
    fn test_load_data_image() {
        let image = ImageEntity::from_data(b"BM\x00\x00".to_vec());
        let (bytes, format) = image.load(&FsImageLoader::new()).unwrap();
        assert_eq!(bytes, b"BM\x00\x00");
        assert_eq!(format, ImageFormat::Bmp);
    }

    #[test]
    fn test_load_url_image() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logo.png"), b"not really a png").unwrap();

        let loader = FsImageLoader::with_base_dir(dir.path());
        let image = ImageEntity::from_url("logo.png").with_size(100, 50);
        let (bytes, format) = image.load(&loader).unwrap();
        assert_eq!(bytes, b"not really a png");
        assert_eq!(format, ImageFormat::Png);

        let missing = ImageEntity::from_url("missing.gif");
        assert!(missing.load(&loader).is_err());
    }

    #[test]
    fn test_defaults() {
        let image = ImageEntity::from_url("a.jpg");
        assert_eq!((image.rowspan, image.colspan), (1, 1));
        assert_eq!(image.to_string(), "image(a.jpg)");
    }
}
