//! Command-line options.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};

pub const USAGE: &str = "\
usage: effect-stack [options]

  --frames N        frames to render (default 8)
  --width W         override FXRING_WIDTH
  --height H        override FXRING_HEIGHT
  --slots N         override FXRING_RING_SLOTS, at least 1
  --strict          fail on missing render targets
  --disable NAME    leave an effect disabled, may repeat
  --assets DIR      load shaders from DIR instead of the built-in copies
  --emit-glsl       print the GLSL each WGSL shader transpiles to and exit
  --help            show this message";

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub frames: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub slots: Option<NonZeroUsize>,
    pub strict: bool,
    pub disabled: Vec<String>,
    pub assets: Option<PathBuf>,
    pub emit_glsl: bool,
    pub help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            frames: 8,
            width: None,
            height: None,
            slots: None,
            strict: false,
            disabled: Vec::new(),
            assets: None,
            emit_glsl: false,
            help: false,
        }
    }
}

impl Options {
    pub fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut options = Options::default();
        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            let mut value = |flag: &str| it.next().ok_or_else(|| anyhow!("{flag} needs a value"));
            match arg.as_str() {
                "--frames" => options.frames = number(&value("--frames")?, "--frames")?,
                "--width" => options.width = Some(number(&value("--width")?, "--width")?),
                "--height" => options.height = Some(number(&value("--height")?, "--height")?),
                "--slots" => options.slots = Some(number(&value("--slots")?, "--slots")?),
                "--strict" => options.strict = true,
                "--disable" => options.disabled.push(value("--disable")?),
                "--assets" => options.assets = Some(PathBuf::from(value("--assets")?)),
                "--emit-glsl" => options.emit_glsl = true,
                "--help" | "-h" => options.help = true,
                other => bail!("unknown argument {other:?}\n\n{USAGE}"),
            }
        }
        Ok(options)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
}

fn number<T: std::str::FromStr>(raw: &str, flag: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().with_context(|| format!("{flag}: {raw:?} is not a number"))
}
