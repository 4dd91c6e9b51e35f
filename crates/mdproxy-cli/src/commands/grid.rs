use crate::cli::GridArgs;
use crate::error::{CliError, Result};
use mdproxy::core::decomp::{DomainLayout, cell_grid, node_grid};
use mdproxy::engine::error::EngineError;
use nalgebra::Vector3;
use tracing::{info, warn};

pub async fn run(args: GridArgs) -> Result<()> {
    for line in grid_lines(&args)? {
        println!("{}", line);
    }
    Ok(())
}

/// The decomposition a run with these parameters would use, as printable lines.
fn grid_lines(args: &GridArgs) -> Result<Vec<String>> {
    let box_l = match args.box_l[..] {
        [edge] => Vector3::new(edge, edge, edge),
        [x, y, z] => Vector3::new(x, y, z),
        _ => {
            return Err(CliError::Argument(format!(
                "--box takes one or three values, got {}",
                args.box_l.len()
            )));
        }
    };
    if args.workers == 0 {
        return Err(CliError::Argument("at least one worker is required".into()));
    }
    if box_l.iter().any(|l| !l.is_finite() || *l <= 0.0) {
        return Err(CliError::Argument("box lengths must be positive".into()));
    }

    let range = args.cutoff + args.skin;
    let nodes = node_grid(args.workers);
    let cells = cell_grid(&box_l, &nodes, range);
    let layout = DomainLayout::new(box_l, nodes, cells).map_err(EngineError::from)?;
    info!(node_grid = %nodes, cell_grid = %cells, range, "Grid computed.");

    let size = layout.cell_size();
    let mut lines = vec![
        format!("NodeGrid = {}", nodes),
        format!("CellGrid = {}", cells),
        format!("CellSize = ({:.4}, {:.4}, {:.4})", size.x, size.y, size.z),
    ];
    if !layout.supports_range(range) {
        warn!(range, "Cells are smaller than the interaction range.");
        lines.push(format!(
            "Warning: cells are smaller than the interaction range {}",
            range
        ));
    }
    Ok(lines)
}
