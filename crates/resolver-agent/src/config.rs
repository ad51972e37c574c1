use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub fixture: PathBuf,
    pub socket: Option<String>,
    pub page_size: usize,
}

pub fn parse_args() -> Result<AgentConfig> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<AgentConfig>
where
    I: IntoIterator<Item = OsString>,
{
    let mut fixture = None;
    let mut socket = None;
    let mut page_size = DEFAULT_PAGE_SIZE;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--fixture" {
            let Some(path) = args.next() else {
                anyhow::bail!("--fixture expects a path");
            };
            fixture = Some(PathBuf::from(path));
        } else if arg == "--socket" {
            let Some(path) = args.next() else {
                anyhow::bail!("--socket expects a path");
            };
            socket = Some(path.to_string_lossy().into_owned());
        } else if arg == "--page-size" {
            let Some(value) = args.next() else {
                anyhow::bail!("--page-size expects a positive number");
            };
            let value = value.to_string_lossy();
            page_size = match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => anyhow::bail!("invalid page size: {value} (expected a positive number)"),
            };
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    let Some(fixture) = fixture else {
        anyhow::bail!("--fixture <path> is required");
    };
    Ok(AgentConfig {
        fixture,
        socket,
        page_size,
    })
}

pub fn runtime_sock_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        format!("{dir}/resolver.sock")
    } else {
        "/tmp/resolver.sock".to_string()
    }
}
