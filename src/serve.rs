//! Local dev server for trying the overlay on a saved results page
//!
//! `report-overlay serve page.html` → serves the page with the wasm adapter
//! injected, plus the `wasm-pack` output under `/pkg/`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, warn};

/// Module name `wasm-pack build --target web` produces for the adapter crate
const ADAPTER_MODULE: &str = "wasm_overlay.js";

pub struct ServeOptions {
    pub port: u16,
    pub page: PathBuf,
    pub pkg_dir: PathBuf,
    pub open_browser: bool,
}

/// Start server, open browser, serve the page until interrupted
pub fn start(options: ServeOptions) -> io::Result<()> {
    let page_html = fs::read_to_string(&options.page)?;
    let page_html = inject_loader(&page_html);

    let addr = format!("127.0.0.1:{}", options.port);
    let server = Server::http(&addr).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let url = format!("http://localhost:{}", options.port);
    eprintln!("\n\x1b[1;32mReport Overlay\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Page: {}", options.page.display());
    eprintln!("   Wasm: {}\n", options.pkg_dir.display());

    if !fs::metadata(options.pkg_dir.join(ADAPTER_MODULE)).map(|m| m.is_file()).unwrap_or(false) {
        warn!(pkg_dir = %options.pkg_dir.display(), "Adapter module not found; run `wasm-pack build --target web` in wasm-overlay");
    }

    if options.open_browser {
        if let Err(e) = open::that(&url) {
            warn!("Could not open browser: {e}");
        }
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &page_html, &options.pkg_dir) {
            warn!("Request failed: {e}");
        }
    }

    Ok(())
}

fn handle_request(request: Request, page_html: &str, pkg_dir: &Path) -> io::Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/");
    let method = request.method().clone();
    debug!(%method, path, "Request");

    match (&method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => {
            let response = Response::from_string(page_html).with_header(content_type_header("text/html; charset=utf-8")?);
            request.respond(response)
        }

        (&Method::Get, p) if p.starts_with("/pkg/") => match resolve_pkg_file(pkg_dir, &p["/pkg/".len()..]) {
            Some(file) => {
                let body = fs::read(&file)?;
                let response = Response::from_data(body).with_header(content_type_header(content_type(&file))?);
                request.respond(response)
            }
            None => not_found(request),
        },

        _ => not_found(request),
    }
}

fn not_found(request: Request) -> io::Result<()> {
    let response = Response::from_string("Not found").with_status_code(404);
    request.respond(response)
}

fn content_type_header(value: &str) -> io::Result<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid header value"))
}

/// Insert the module script that boots the adapter, just before `</body>`
pub fn inject_loader(page: &str) -> String {
    let script = format!(
        "<script type=\"module\">import init from '/pkg/{}'; init();</script>\n",
        ADAPTER_MODULE
    );
    match page.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(page.len() + script.len());
            out.push_str(&page[..at]);
            out.push_str(&script);
            out.push_str(&page[at..]);
            out
        }
        None => format!("{}{}", page, script),
    }
}

/// Map a request path below `/pkg/` to a file inside `pkg_dir`.
///
/// Anything that is not a plain relative path, or that does not exist as a
/// file, resolves to `None`.
pub fn resolve_pkg_file(pkg_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }

    let root = pkg_dir.canonicalize().ok()?;
    let file = root.join(relative).canonicalize().ok()?;
    if file.starts_with(&root) && file.is_file() {
        Some(file)
    } else {
        None
    }
}

pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wasm") => "application/wasm",
        Some("js") => "text/javascript",
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("ts") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // LOADER INJECTION TESTS
    // ==========================================================================

    #[test]
    fn test_loader_goes_before_body_close() {
        let page = "<html><body><p>results</p></BODY></html>";
        let out = inject_loader(page);
        let script_at = out.find("<script type=\"module\">").unwrap();
        assert!(script_at < out.find("</BODY>").unwrap());
        assert!(out.contains("import init from '/pkg/wasm_overlay.js'"));
        assert!(out.starts_with("<html><body><p>results</p>"));
    }

    #[test]
    fn test_loader_appended_without_body() {
        let out = inject_loader("<p>fragment</p>");
        assert!(out.starts_with("<p>fragment</p><script"));
    }

    // ==========================================================================
    // PKG RESOLUTION TESTS
    // ==========================================================================

    #[test]
    fn test_pkg_file_resolves() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wasm_overlay_bg.wasm"), b"\0asm").unwrap();

        let file = resolve_pkg_file(dir.path(), "wasm_overlay_bg.wasm").unwrap();
        assert_eq!(content_type(&file), "application/wasm");
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(dir.path().join("secret.txt"), "no").unwrap();

        assert_eq!(resolve_pkg_file(&pkg, "../secret.txt"), None);
        assert_eq!(resolve_pkg_file(&pkg, "/etc/passwd"), None);
        assert_eq!(resolve_pkg_file(&pkg, ""), None);
    }

    #[test]
    fn test_missing_file_and_directories_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("snippets")).unwrap();
        assert_eq!(resolve_pkg_file(dir.path(), "nope.js"), None);
        assert_eq!(resolve_pkg_file(dir.path(), "snippets"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a/wasm_overlay.js")), "text/javascript");
        assert_eq!(content_type(Path::new("package.json")), "application/json");
        assert_eq!(content_type(Path::new("README")), "application/octet-stream");
    }
}
