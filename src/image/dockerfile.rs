//! Dockerfile rendering
//!
//! The image runs the npm `mcp-proxy` on a Python base, so Node.js is always
//! installed. Server sources are copied from `mcp-server/` in the build
//! context into `/app`.

use super::error::BuildError;
use super::spec::ImageSpec;
use crate::detection::PackageManager;
use std::fmt::Write;
use std::path::Path;

pub const BASE_IMAGE: &str = "python:3.12-slim-bookworm";

/// Directory inside the build context that holds the server sources
pub const SOURCE_DIR: &str = "mcp-server";

const APP_DIR: &str = "/app";

/// Executables that need uv on the image
const UV_COMMANDS: &[&str] = &["uv", "uvx"];

pub fn render(spec: &ImageSpec) -> String {
    let profile = &spec.package_manager_profile;
    // An override can launch through uvx while classed stdio-direct
    let needs_uv = profile.manager == PackageManager::Uv
        || UV_COMMANDS.contains(&spec.entrypoint.command());
    let installs_project = profile.manifest_path.as_deref() == Some("pyproject.toml");

    let mut out = String::new();
    out.push_str("# Generated by mcpdock\n");
    let _ = writeln!(out, "FROM {}", BASE_IMAGE);
    out.push('\n');
    out.push_str("RUN apt-get update \\\n");
    out.push_str("    && apt-get install -y --no-install-recommends nodejs npm \\\n");
    out.push_str("    && rm -rf /var/lib/apt/lists/*\n");
    out.push_str("RUN npm install -g mcp-proxy\n");

    if needs_uv {
        out.push_str("RUN pip install --no-cache-dir uv\n");
    }
    if profile.manager == PackageManager::Poetry {
        out.push_str("RUN pip install --no-cache-dir poetry \\\n");
        out.push_str("    && poetry config virtualenvs.create false\n");
    }

    out.push('\n');
    let _ = writeln!(out, "WORKDIR {}", APP_DIR);
    let _ = writeln!(out, "COPY {}/ {}/", SOURCE_DIR, APP_DIR);
    out.push('\n');

    match profile.manager {
        PackageManager::Pip => {
            out.push_str("RUN pip install --no-cache-dir -r requirements.txt\n");
        }
        PackageManager::Uv => {
            if profile.manifest_path.as_deref() == Some("uv.lock") {
                out.push_str("RUN uv sync --frozen --no-dev --no-editable\n");
            } else {
                out.push_str("RUN uv sync --no-dev --no-editable\n");
            }
            let _ = writeln!(out, "ENV PATH=\"{}/.venv/bin:$PATH\"", APP_DIR);
        }
        PackageManager::Poetry => {
            out.push_str("RUN poetry install --only main --no-interaction\n");
        }
        PackageManager::SetupPy => {
            out.push_str("RUN pip install --no-cache-dir .\n");
        }
        PackageManager::NoneDetected if installs_project => {
            out.push_str("RUN pip install --no-cache-dir .\n");
        }
        PackageManager::NoneDetected => {
            out.push_str("# No dependency manifest detected; installing the MCP SDK only\n");
            out.push_str("RUN pip install --no-cache-dir mcp\n");
        }
    }

    if !spec.environment_variables.is_empty() {
        out.push('\n');
        for (key, value) in &spec.environment_variables {
            let _ = writeln!(out, "ENV {}=\"{}\"", key, escape_env_value(value));
        }
    }

    out.push('\n');
    let _ = writeln!(out, "EXPOSE {}", spec.port());
    let _ = writeln!(out, "{}", healthcheck(spec.port()));
    let _ = writeln!(out, "ENTRYPOINT {}", exec_form(&spec.entrypoint.proxy_argv()));
    out
}

/// Reads a user-supplied Dockerfile that replaces the rendered one
pub fn load_custom(path: &Path) -> Result<String, BuildError> {
    std::fs::read_to_string(path).map_err(|e| BuildError::DockerfileUnreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// JSON-array (exec) form, e.g. `["mcp-proxy", "--port", "8000"]`
fn exec_form(argv: &[String]) -> String {
    let items: Vec<String> = argv
        .iter()
        .map(|arg| serde_json::Value::String(arg.clone()).to_string())
        .collect();
    format!("[{}]", items.join(", "))
}

/// TCP probe on the proxy port. The slim base has no curl, and the SSE
/// endpoint never finishes a response.
fn healthcheck(port: u16) -> String {
    format!(
        "HEALTHCHECK --interval=30s --timeout=5s --start-period=15s --retries=3 \\\n    \
         CMD python -c \"import socket; socket.create_connection(('127.0.0.1', {}), 3).close()\"",
        port
    )
}

/// Multi-line values never get here; `ImageSpecBuilder::build` rejects them
fn escape_env_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}
