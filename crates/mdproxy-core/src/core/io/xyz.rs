use crate::core::models::particle::Particle;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Header announces {expected} particles but {found} were read")]
    CountMismatch { expected: usize, found: usize },
}

/// Box lengths plus every particle, as stored in an XYZ snapshot.
///
/// Each particle line is `id type x y z [vx vy vz]`. Mass and image counters
/// are not stored: particles read back have unit mass and zero images, and
/// positions are the folded ones.
#[derive(Debug, Clone, PartialEq)]
pub struct XyzSnapshot {
    pub box_l: Vector3<f64>,
    pub particles: Vec<Particle>,
}

pub struct XyzFile;

const MAX_PREALLOCATED: usize = 1 << 16;

impl XyzFile {
    pub fn read_from(reader: &mut impl BufRead) -> Result<XyzSnapshot, XyzError> {
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));

        let (line_no, header) = next_line(&mut lines, 1)?;
        let expected: usize = header.trim().parse().map_err(|_| XyzError::Parse {
            line: line_no,
            message: format!("expected particle count, found '{}'", header.trim()),
        })?;

        let (line_no, box_line) = next_line(&mut lines, 2)?;
        let box_values = parse_floats(&box_line, line_no)?;
        if box_values.len() != 3 {
            return Err(XyzError::Parse {
                line: line_no,
                message: format!("expected 3 box lengths, found {}", box_values.len()),
            });
        }
        let box_l = Vector3::new(box_values[0], box_values[1], box_values[2]);

        // The header is untrusted; a corrupt count must surface as a mismatch.
        let mut particles = Vec::with_capacity(expected.min(MAX_PREALLOCATED));
        for (line_no, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            particles.push(parse_particle(&line, line_no)?);
        }

        if particles.len() != expected {
            return Err(XyzError::CountMismatch {
                expected,
                found: particles.len(),
            });
        }
        Ok(XyzSnapshot { box_l, particles })
    }

    pub fn write_to(snapshot: &XyzSnapshot, writer: &mut impl Write) -> Result<(), XyzError> {
        let mut sorted: Vec<&Particle> = snapshot.particles.iter().collect();
        sorted.sort_by_key(|p| p.id);

        writeln!(writer, "{}", sorted.len())?;
        writeln!(
            writer,
            "{:15.10} {:15.10} {:15.10}",
            snapshot.box_l.x, snapshot.box_l.y, snapshot.box_l.z
        )?;
        for p in sorted {
            writeln!(
                writer,
                "{} {} {:15.10} {:15.10} {:15.10} {:15.10} {:15.10} {:15.10}",
                p.id,
                p.type_id,
                p.position.x,
                p.position.y,
                p.position.z,
                p.velocity.x,
                p.velocity.y,
                p.velocity.z
            )?;
        }
        Ok(())
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<XyzSnapshot, XyzError> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn write_to_path(snapshot: &XyzSnapshot, path: impl AsRef<Path>) -> Result<(), XyzError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(snapshot, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn next_line(
    lines: &mut impl Iterator<Item = (usize, io::Result<String>)>,
    expected_line: usize,
) -> Result<(usize, String), XyzError> {
    match lines.next() {
        Some((line_no, line)) => Ok((line_no, line?)),
        None => Err(XyzError::Parse {
            line: expected_line,
            message: "unexpected end of file".to_string(),
        }),
    }
}

fn parse_floats(line: &str, line_no: usize) -> Result<Vec<f64>, XyzError> {
    line.split_whitespace()
        .map(|field| {
            field.parse::<f64>().map_err(|_| XyzError::Parse {
                line: line_no,
                message: format!("invalid number '{}'", field),
            })
        })
        .collect()
}

fn parse_particle(line: &str, line_no: usize) -> Result<Particle, XyzError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 && fields.len() != 8 {
        return Err(XyzError::Parse {
            line: line_no,
            message: format!(
                "expected 'id type x y z [vx vy vz]', found {} fields",
                fields.len()
            ),
        });
    }
    let parse_usize = |field: &str, what: &str| {
        field.parse::<usize>().map_err(|_| XyzError::Parse {
            line: line_no,
            message: format!("invalid {} '{}'", what, field),
        })
    };
    let id = parse_usize(fields[0], "particle id")?;
    let type_id = parse_usize(fields[1], "particle type")?;
    let values = parse_floats(&fields[2..].join(" "), line_no)?;

    let mut particle = Particle::new(id, Point3::new(values[0], values[1], values[2]))
        .with_type(type_id);
    if values.len() == 6 {
        particle.velocity = Vector3::new(values[3], values[4], values[5]);
    }
    Ok(particle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ParticleId;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sample_snapshot() -> XyzSnapshot {
        XyzSnapshot {
            box_l: Vector3::new(10.0, 12.0, 14.0),
            particles: vec![
                Particle::new(3, Point3::new(1.0, 2.0, 3.0))
                    .with_type(1)
                    .with_velocity(Vector3::new(0.5, -0.5, 0.25)),
                Particle::new(1, Point3::new(4.0, 5.0, 6.0)),
            ],
        }
    }

    #[test]
    fn write_to_sorts_particles_by_id() {
        let mut buffer = Vec::new();
        XyzFile::write_to(&sample_snapshot(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2");
        assert!(lines[2].starts_with("1 0 "));
        assert!(lines[3].starts_with("3 1 "));
    }

    #[test]
    fn written_snapshot_reads_back_through_a_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.xyz");
        XyzFile::write_to_path(&sample_snapshot(), &path).unwrap();

        let snapshot = XyzFile::read_from_path(&path).unwrap();
        assert_eq!(snapshot.box_l, Vector3::new(10.0, 12.0, 14.0));
        assert_eq!(snapshot.particles.len(), 2);
        let p = &snapshot.particles[1];
        assert_eq!(p.id, ParticleId(3));
        assert_eq!(p.type_id, 1);
        assert_eq!(p.velocity, Vector3::new(0.5, -0.5, 0.25));
    }

    #[test]
    fn read_accepts_lines_without_velocities() {
        let input = "1\n5 5 5\n0 2 1.0 2.0 3.0\n";
        let snapshot = XyzFile::read_from(&mut Cursor::new(input)).unwrap();
        assert_eq!(snapshot.particles[0].type_id, 2);
        assert_eq!(snapshot.particles[0].velocity, Vector3::zeros());
    }

    #[test]
    fn read_reports_the_offending_line() {
        let input = "2\n5 5 5\n0 0 1.0 2.0 3.0\n1 0 1.0 oops 3.0\n";
        let result = XyzFile::read_from(&mut Cursor::new(input));
        assert!(matches!(result, Err(XyzError::Parse { line: 4, .. })));
    }

    #[test]
    fn read_detects_count_mismatch() {
        let input = "3\n5 5 5\n0 0 1.0 2.0 3.0\n";
        let result = XyzFile::read_from(&mut Cursor::new(input));
        assert!(matches!(
            result,
            Err(XyzError::CountMismatch {
                expected: 3,
                found: 1
            })
        ));
    }

    #[test]
    fn absurd_header_count_is_a_mismatch_not_an_allocation() {
        let input = "18446744073709551615\n10 10 10\n0 0 1 1 1\n";
        let result = XyzFile::read_from(&mut Cursor::new(input));
        assert!(matches!(
            result,
            Err(XyzError::CountMismatch {
                expected: usize::MAX,
                found: 1
            })
        ));
    }

    #[test]
    fn mass_and_images_do_not_survive_a_round_trip() {
        let mut heavy = Particle::new(0, Point3::new(1.0, 1.0, 1.0)).with_mass(3.5);
        heavy.image = Vector3::new(1, 0, -2);
        let snapshot = XyzSnapshot {
            box_l: Vector3::new(5.0, 5.0, 5.0),
            particles: vec![heavy],
        };

        let mut buffer = Vec::new();
        XyzFile::write_to(&snapshot, &mut buffer).unwrap();
        let restored = XyzFile::read_from(&mut Cursor::new(buffer)).unwrap();

        let p = &restored.particles[0];
        assert_eq!(p.position, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p.mass, 1.0);
        assert_eq!(p.image, Vector3::zeros());
    }

    #[test]
    fn read_rejects_empty_input() {
        let result = XyzFile::read_from(&mut Cursor::new(""));
        assert!(matches!(result, Err(XyzError::Parse { line: 1, .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let result = XyzFile::read_from_path(dir.path().join("absent.xyz"));
        assert!(matches!(result, Err(XyzError::Io(_))));
    }
}
