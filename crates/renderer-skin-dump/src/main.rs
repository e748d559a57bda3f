use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use log::{error, info};
use renderer_asset::{
    loader::{
        skin::{load_scene, SkinLoadError, SkinnedSceneAsset},
        SkinLoadParams,
    },
    scene::SceneAsset,
    weight::MAX_INFLUENCES,
};

#[derive(Parser, Debug)]
#[command(name = "renderer-skin-dump", about = "Print skinning data of a JSON scene")]
struct Cli {
    /// Rescale retained weights of every vertex to sum to 1
    #[arg(long)]
    normalize: bool,
    /// Influence slots per vertex
    #[arg(long, default_value_t = MAX_INFLUENCES)]
    max_influences: usize,
    /// Scene file in JSON
    path: PathBuf,
}

impl Cli {
    fn params(&self) -> SkinLoadParams {
        SkinLoadParams {
            max_influences: self.max_influences,
            normalize_weights: self.normalize,
        }
    }
}

#[derive(Debug)]
enum DumpError {
    Io(io::Error),
    Json(serde_json::Error),
    Load(SkinLoadError),
}

impl Display for DumpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Io(error) => Display::fmt(error, f),
            DumpError::Json(error) => write!(f, "Bad scene file: {}", error),
            DumpError::Load(error) => Display::fmt(error, f),
        }
    }
}

impl Error for DumpError {}

impl From<io::Error> for DumpError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for DumpError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SkinLoadError> for DumpError {
    fn from(value: SkinLoadError) -> Self {
        Self::Load(value)
    }
}

fn print_scene(scene: &SkinnedSceneAsset) {
    println!("scene: {}", scene.name.as_deref().unwrap_or("<unnamed>"));
    for (index, mesh) in scene.meshes.iter().enumerate() {
        let name = mesh.name.as_deref().unwrap_or("<unnamed>");
        match &mesh.attributes {
            Some(attributes) => println!(
                "mesh #{} {}: {} vertices, {:?} indices, {} of {} influences used",
                index,
                name,
                attributes.vertex_count(),
                attributes.joints.width(),
                attributes.meaningful_influences(),
                attributes.influences_per_vertex,
            ),
            None => println!("mesh #{} {}: no bones", index, name),
        }
    }
    match &scene.skeleton {
        Ok(Some(skeleton)) => {
            println!("skeleton: {} joints", skeleton.joints.len());
            for joint in &skeleton.joints {
                let parent = joint
                    .parent
                    .map(|parent| parent.to_string())
                    .unwrap_or_else(|| String::from("-"));
                println!(
                    "  #{} {} (parent {}) translation {} scale {}",
                    joint.id,
                    joint.name,
                    parent,
                    joint.local_transform.translation,
                    joint.local_transform.scale,
                );
            }
            for error in &skeleton.errors {
                println!("  warning: {}", error);
            }
        }
        Ok(None) => println!("skeleton: none"),
        Err(err) => println!("skeleton: failed, {}", err),
    }
}

fn run(cli: Cli) -> Result<(), DumpError> {
    info!("Loading scene from {}", cli.path.display());
    let file = File::open(&cli.path)?;
    let scene: SceneAsset = serde_json::from_reader(BufReader::new(file))?;
    let skinned = load_scene(&scene, cli.params())?;
    print_scene(&skinned);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
