//! Entry point for the airport scene viewer.
//! Logging + command-line options, then hand off to the platform shell.

use std::path::PathBuf;

use anyhow::Result;
use corelib::loading::LoadPolicy;
use corelib::presets::SceneKind;
use platform::ViewerOptions;

fn parse_backend(val: &str) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{other}', falling back to auto.");
            wgpu::Backends::all()
        }
    }
}

fn parse_switch(val: &str) -> bool {
    matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> ViewerOptions {
    let mut opts = ViewerOptions::default();
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--gpu-backend=") {
            opts.backends = parse_backend(v);
        } else if arg == "--show-fps" {
            opts.show_fps = true;
        } else if let Some(v) = arg.strip_prefix("--show-fps=") {
            opts.show_fps = parse_switch(v);
        } else if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        } else if let Some(v) = arg.strip_prefix("--assets=") {
            opts.assets = PathBuf::from(v);
        } else if let Some(v) = arg.strip_prefix("--scene=") {
            match v.parse::<SceneKind>() {
                Ok(kind) => opts.scene = kind,
                Err(e) => log::warn!("{e}, using {:?}.", opts.scene),
            }
        } else if let Some(v) = arg.strip_prefix("--load-policy=") {
            match v.parse::<LoadPolicy>() {
                Ok(policy) => opts.load_policy = policy,
                Err(e) => log::warn!("{e}, using {:?}.", opts.load_policy),
            }
        } else if let Some(v) = arg.strip_prefix("--frames=") {
            match v.parse::<u64>() {
                Ok(n) if n > 0 => opts.frames = Some(n),
                _ => log::warn!("Ignoring --frames={v}: expected a positive count."),
            }
        }
    }

    opts.width = w.unwrap_or(opts.width).max(1);
    opts.height = h.unwrap_or(opts.height).max(1);
    opts
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args(std::env::args().skip(1));
    log::info!(
        "Starting viewer. Backend: {:?}, scene={:?}, assets='{}', load_policy={:?}, show_fps={}, window_size={}x{}",
        opts.backends,
        opts.scene,
        opts.assets.display(),
        opts.load_policy,
        opts.show_fps,
        opts.width,
        opts.height
    );

    platform::run(opts)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> ViewerOptions {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_flags() {
        let o = args(&[]);
        assert_eq!((o.width, o.height), (1280, 720));
        assert_eq!(o.backends, wgpu::Backends::all());
        assert_eq!(o.scene, SceneKind::Airport);
        assert_eq!(o.load_policy, LoadPolicy::BestEffort);
        assert_eq!(o.assets, PathBuf::from("static"));
        assert!(!o.show_fps);
        assert_eq!(o.frames, None);
    }

    #[test]
    fn size_and_width_flags() {
        let o = args(&["--size=800X600"]);
        assert_eq!((o.width, o.height), (800, 600));
        let o = args(&["--size=800x600", "--width=1024", "--height=0"]);
        assert_eq!((o.width, o.height), (1024, 1));
    }

    #[test]
    fn viewer_flags() {
        let o = args(&[
            "--gpu-backend=VK",
            "--show-fps=on",
            "--assets=/srv/airport",
            "--scene=shaders",
            "--load-policy=fail-fast",
            "--frames=120",
        ]);
        assert_eq!(o.backends, wgpu::Backends::VULKAN);
        assert!(o.show_fps);
        assert_eq!(o.assets, PathBuf::from("/srv/airport"));
        assert_eq!(o.scene, SceneKind::Shaders);
        assert_eq!(o.load_policy, LoadPolicy::FailFast);
        assert_eq!(o.frames, Some(120));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let o = args(&["--scene=space", "--load-policy=maybe", "--frames=0", "--gpu-backend=glide"]);
        assert_eq!(o.scene, SceneKind::Airport);
        assert_eq!(o.load_policy, LoadPolicy::BestEffort);
        assert_eq!(o.frames, None);
        assert_eq!(o.backends, wgpu::Backends::all());
    }
}
