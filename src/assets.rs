use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use tiny_http::{Header, Response, Server, StatusCode};
use tracing::{debug, info};

/// Serves the browser client from `root`. Blocks the calling thread.
pub fn serve_static(addr: &str, root: PathBuf) -> anyhow::Result<()> {
    let root = root.canonicalize()?;
    let server = Server::http(addr).map_err(|e| anyhow::anyhow!("bind {addr}: {e}"))?;
    info!(root = %root.display(), "serving client on http://{addr}");

    for request in server.incoming_requests() {
        let url = request.url().to_string();
        let status = match resolve(&root, url.split('?').next().unwrap_or("/")) {
            Some(path) => match fs::File::open(&path) {
                Ok(file) => {
                    let mut resp = Response::from_file(file).with_status_code(StatusCode(200));
                    if let Ok(h) = Header::from_bytes("Content-Type", content_type_for(&path)) {
                        resp.add_header(h);
                    }
                    let _ = request.respond(resp);
                    200
                }
                Err(_) => {
                    let _ = request.respond(not_found());
                    404
                }
            },
            None => {
                let _ = request.respond(not_found());
                404
            }
        };
        debug!(%url, status, "static request");
    }
    Ok(())
}

/// Maps a request path into `root`, refusing anything that escapes it.
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = url.trim_start_matches('/');
    let rel = if rel.is_empty() { "index.html" } else { rel };
    let mut path = root.join(rel);
    if path.is_dir() {
        path = path.join("index.html");
    }
    let path = path.canonicalize().ok()?;
    (path.is_file() && path.starts_with(root)).then_some(path)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn not_found() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(StatusCode(404))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tetris-battle-assets-{}", std::process::id()));
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join("index.html"), "<html></html>").unwrap();
        fs::write(dir.join("css").join("site.css"), "body{}").unwrap();
        dir.canonicalize().unwrap()
    }

    #[test]
    fn resolves_index_and_nested_files() {
        let root = scratch_root();
        assert_eq!(resolve(&root, "/"), Some(root.join("index.html")));
        assert_eq!(resolve(&root, "/css/site.css"), Some(root.join("css/site.css")));
        assert_eq!(resolve(&root, "/missing.js"), None);
    }

    #[test]
    fn refuses_to_leave_the_root() {
        let root = scratch_root();
        assert_eq!(resolve(&root, "/../../etc/passwd"), None);
        assert_eq!(resolve(&root, "/css/../../"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for(Path::new("a.js")), "application/javascript");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
