use argh::FromArgs;
use std::path::PathBuf;

use epipolar::geometry::{Camera, CameraExtrinsics, CameraIntrinsics, Pose};
use epipolar::matching::{Feature, ScaledL2Distance};
use epipolar::TwoViewOptions;
use glam::{DMat3, DVec3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(FromArgs)]
/// Estimate the relative pose of two synthetic cameras from matched features
struct Args {
    /// number of landmarks seen by both cameras
    #[argh(option, default = "200")]
    num_points: usize,

    /// fraction of landmarks observed at a wrong position in the second image
    #[argh(option, default = "0.2")]
    outlier_ratio: f64,

    /// half width of the uniform noise added to every pixel coordinate
    #[argh(option, default = "0.0")]
    pixel_noise: f64,

    /// seed of the scene generator
    #[argh(option, default = "0")]
    seed: u64,

    /// path to a JSON file with pipeline options
    #[argh(option)]
    config: Option<PathBuf>,
}

const DESCRIPTOR_SIZE: usize = 128;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let options: TwoViewOptions = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => TwoViewOptions::default(),
    };
    log::info!("pipeline options: {}", serde_json::to_string(&options)?);

    let intrinsics =
        CameraIntrinsics::from_focal_length(700.0, 700.0, 320.0, 240.0).with_image_size(640, 480);
    let truth = Pose::new(
        DMat3::from_rotation_y(0.15) * DMat3::from_rotation_x(-0.05),
        DVec3::new(-1.0, 0.1, 0.15).normalize(),
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let (mut features1, mut features2) = generate_features(&args, &intrinsics, &truth, &mut rng);
    println!(
        "Generated {} features in image 1 and {} in image 2",
        features1.len(),
        features2.len()
    );

    let result = epipolar::estimate_two_view::<ScaledL2Distance>(
        &mut features1,
        &mut features2,
        &intrinsics,
        &intrinsics,
        &options,
    )?;

    println!("Inliers: {}", result.inliers.len());
    println!("Fundamental matrix: {:?}", result.fundamental);
    println!("Recovered rotation: {:?}", result.pose.rotation);
    println!("Recovered translation: {:?}", result.pose.translation);

    let rotation_error = rotation_angle(&(result.pose.rotation * truth.rotation.transpose()));
    let translation_error = result.pose.translation.angle_between(truth.translation);
    println!(
        "Rotation error: {:.6} deg, translation direction error: {:.6} deg",
        rotation_error.to_degrees(),
        translation_error.to_degrees()
    );

    Ok(())
}

fn generate_features(
    args: &Args,
    intrinsics: &CameraIntrinsics,
    truth: &Pose,
    rng: &mut StdRng,
) -> (Vec<Feature>, Vec<Feature>) {
    let camera1 = Camera::new(*intrinsics, CameraExtrinsics::default());
    let camera2 = Camera::new(*intrinsics, CameraExtrinsics::new(*truth));
    let num_outliers = (args.outlier_ratio * args.num_points as f64).round() as usize;

    let mut features1 = Vec::with_capacity(args.num_points);
    let mut features2 = Vec::with_capacity(args.num_points);
    while features1.len() < args.num_points {
        let world = DVec3::new(
            rng.random_range(-4.0..4.0),
            rng.random_range(-3.0..3.0),
            rng.random_range(6.0..20.0),
        );
        let (Some(x1), Some(mut x2)) = (camera1.project(world), camera2.project(world)) else {
            continue;
        };
        if !intrinsics.is_in_image(x1.x, x1.y) || !intrinsics.is_in_image(x2.x, x2.y) {
            continue;
        }
        if features1.len() < num_outliers {
            x2.x = rng.random_range(0.0..640.0);
            x2.y = rng.random_range(0.0..480.0);
        }

        let mut jitter = || {
            if args.pixel_noise > 0.0 {
                rng.random_range(-args.pixel_noise..args.pixel_noise)
            } else {
                0.0
            }
        };
        let (u1, v1) = (x1.x + jitter(), x1.y + jitter());
        let (u2, v2) = (x2.x + jitter(), x2.y + jitter());

        let descriptor: Vec<f32> = (0..DESCRIPTOR_SIZE)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        let observed = descriptor
            .iter()
            .map(|d| d + rng.random_range(-0.02..0.02))
            .collect();
        features1.push(Feature::new(u1, v1, descriptor));
        features2.push(Feature::new(u2, v2, observed));
    }
    features2.shuffle(rng);

    (features1, features2)
}

fn rotation_angle(rotation: &DMat3) -> f64 {
    let trace = rotation.x_axis.x + rotation.y_axis.y + rotation.z_axis.z;
    ((trace - 1.0) / 2.0).clamp(-1.0, 1.0).acos()
}
