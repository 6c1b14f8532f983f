//! Directory listing page

use crate::http::path::{percent_decode, percent_encode};
use crate::http::response::escape_html;
use std::fmt::Write;
use std::io;
use std::path::Path;
use tokio::fs;

/// One row of the listing
struct Entry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

impl Entry {
    fn href(&self) -> String {
        let encoded = percent_encode(&self.name);
        if self.is_dir {
            encoded + "/"
        } else {
            encoded
        }
    }

    fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Render an HTML index of `dir`, sorted case-insensitively by name.
///
/// `request_path` is the raw URI path and only appears in the title and heading.
pub async fn render(dir: &Path, request_path: &str) -> io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;

    while let Some(dir_entry) = read_dir.next_entry().await? {
        let is_symlink = dir_entry
            .file_type()
            .await
            .map(|t| t.is_symlink())
            .unwrap_or(false);
        // follows symlinks, a dangling link is listed as a plain entry
        let is_dir = fs::metadata(dir_entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

        entries.push(Entry {
            name: dir_entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_cached_key(|entry| entry.name.to_lowercase());

    let display_path = percent_decode(request_path).unwrap_or_else(|| request_path.to_string());
    let title = format!("Directory listing for {}", escape_html(&display_path));

    let mut html = String::with_capacity(256 + entries.len() * 64);
    let _ = write!(
        html,
        "<!DOCTYPE HTML>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <hr>\n\
         <ul>\n"
    );
    for entry in &entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&entry.href()),
            escape_html(&entry.display_name())
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sorted_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.txt"), "").unwrap();
        std::fs::write(dir.path().join("Alpha.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("gamma")).unwrap();

        let html = render(dir.path(), "/").await.unwrap();
        let alpha = html.find("Alpha.txt").unwrap();
        let beta = html.find("beta.txt").unwrap();
        let gamma = html.find("gamma/").unwrap();
        assert!(alpha < beta && beta < gamma);
        assert!(html.contains("<h1>Directory listing for /</h1>"));
    }

    #[tokio::test]
    async fn test_names_are_escaped_and_encoded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a&b <c>.txt"), "").unwrap();

        let html = render(dir.path(), "/sub%20dir/").await.unwrap();
        assert!(html.contains("<title>Directory listing for /sub dir/</title>"));
        assert!(html.contains(
            "<li><a href=\"a%26b%20%3Cc%3E.txt\">a&amp;b &lt;c&gt;.txt</a></li>"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_marked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let html = render(dir.path(), "/").await.unwrap();
        assert!(html.contains("<li><a href=\"alias/\">alias@</a></li>"));
        assert!(html.contains("<li><a href=\"real/\">real/</a></li>"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render(&dir.path().join("nope"), "/nope/").await.is_err());
    }
}
