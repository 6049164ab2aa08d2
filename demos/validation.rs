//! Runs the same operations in CPU and GPU mode and checks that they agree.
//!
//! ```text
//! cargo run --example validation --features wgpu
//! RUST_LOG=mlkit=debug cargo run --example validation --features wgpu -- gpu
//! ```
//!
//! The optional argument names the mode compared against the CPU (`gpu` by
//! default).

use mlkit::{ComputeMode, Matrix, matrix, set_compute_mode};
use tracing_subscriber::EnvFilter;

struct Results {
    add: Matrix,
    sub: Matrix,
    scaled: Matrix,
    product: Matrix,
}

fn run(m: &Matrix) -> mlkit::Result<Results> {
    Ok(Results {
        add: m.checked_add(m)?,
        sub: m.checked_sub(m)?,
        scaled: m.checked_scale(3.0)?,
        product: m.checked_mul(&m.transpose())?,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let other: ComputeMode = std::env::args()
        .nth(1)
        .map_or(Ok(ComputeMode::Gpu), |arg| arg.parse())?;

    let m = matrix![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
    println!("m =\n{m}\n");

    set_compute_mode(ComputeMode::Cpu);
    let cpu = run(&m)?;
    println!("m + m =\n{}\n", cpu.add);
    println!("m - m =\n{}\n", cpu.sub);
    println!("m * 3 =\n{}\n", cpu.scaled);
    println!("m * mᵀ =\n{}\n", cpu.product);

    // a 3x2 matrix cannot multiply itself
    if let Err(e) = m.checked_mul(&m) {
        println!("m * m rejected: {e}\n");
    }

    set_compute_mode(other);
    let result = run(&m);
    set_compute_mode(ComputeMode::Cpu);

    let other_results = match result {
        Ok(r) => r,
        Err(e) => {
            println!("{other} mode unavailable: {e}");
            return Ok(());
        }
    };

    let checks = [
        ("add", &cpu.add, &other_results.add),
        ("sub", &cpu.sub, &other_results.sub),
        ("scale", &cpu.scaled, &other_results.scaled),
        ("product", &cpu.product, &other_results.product),
    ];
    for (name, expected, actual) in checks {
        println!("cpu {name} == {other} {name}: {}", expected == actual);
    }

    Ok(())
}
