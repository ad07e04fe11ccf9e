// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use super::runner::WeldRun;
use crate::geometry::{Aabb, CandidatePairs, MeshValidation};
use colored::*;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report one welded file
    pub fn report_weld(run: &WeldRun) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "File:".bold(), run.input.display().to_string().cyan());
        if let Some(ref output) = run.output {
            println!("{} {}", "Output:".bold(), output.display().to_string().cyan());
        }
        println!("{}", "━".repeat(80).bright_black());

        let stats = &run.stats;
        println!("\n{}", "Welding:".bold());
        Self::print_count(
            "Vertices",
            &format!("{} → {}", stats.input_vertices, stats.output_vertices),
            stats.removed_vertices(),
        );
        Self::print_count(
            "Faces",
            &format!("{} → {}", stats.input_faces, stats.output_faces),
            stats.dropped_faces,
        );
        println!(
            "  {} {} ({} confirmed)",
            "Candidates:".bright_black(),
            stats.candidate_pairs.to_string().cyan(),
            stats.confirmed_pairs.to_string().cyan()
        );
        if run.orphans_removed > 0 {
            println!(
                "  {} {}",
                "Orphans removed:".bright_black(),
                run.orphans_removed.to_string().yellow()
            );
        }

        if let Some(verification) = run.verification {
            if verification.matches {
                println!(
                    "\n{} {}",
                    "✅".green(),
                    format!(
                        "Broad phase matches exhaustive check ({} pairs)",
                        verification.broad_phase_pairs
                    )
                    .green()
                );
            } else {
                println!(
                    "\n{} {}",
                    "❌".red(),
                    format!(
                        "Broad phase found {} pairs, exhaustive check found {}",
                        verification.broad_phase_pairs, verification.brute_force_pairs
                    )
                    .red()
                    .bold()
                );
            }
        }

        if let Some(ref topology) = run.topology {
            Self::report_topology(topology);
        }

        println!(
            "\n  {} {}",
            "Time:".bright_black(),
            Self::format_duration(run.duration).yellow()
        );
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report mesh shape for `inspect`
    pub fn report_inspect(file: &str, vertices: usize, faces: usize, bounds: &Aabb, topology: &MeshValidation) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Mesh:".bold(), file.cyan());
        println!("{}", "━".repeat(80).bright_black());
        println!("  {} {}", "Vertices:".bright_black(), vertices.to_string().cyan());
        println!("  {} {}", "Faces:".bright_black(), faces.to_string().cyan());
        if vertices > 0 {
            println!(
                "  {} ({:.4}, {:.4}, {:.4}) → ({:.4}, {:.4}, {:.4})",
                "Bounds:".bright_black(),
                bounds.min.x,
                bounds.min.y,
                bounds.min.z,
                bounds.max.x,
                bounds.max.y,
                bounds.max.z
            );
        }
        Self::report_topology(topology);
        println!("{}", "━".repeat(80).bright_black());
    }

    fn report_topology(topology: &MeshValidation) {
        println!("\n{}", "Topology:".bold());
        Self::print_flag("Manifold", topology.is_manifold);
        Self::print_flag("Closed", topology.is_closed);
        println!("  {} {}", "Edges:".bright_black(), topology.edge_count.to_string().cyan());
        Self::print_count("Boundary edges", &topology.boundary_edge_count.to_string(), topology.boundary_edge_count);
        Self::print_count(
            "Degenerate faces",
            &topology.degenerate_face_count.to_string(),
            topology.degenerate_face_count,
        );
    }

    /// Print candidate pairs, one per line
    pub fn report_pairs(pairs: &CandidatePairs) {
        for (i, j) in pairs {
            println!("{} {}", i, j);
        }
        eprintln!("{} {}", "Candidate pairs:".bright_black(), pairs.len().to_string().cyan());
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        println!("\n{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    /// Yellow when something changed, green otherwise
    fn print_count(name: &str, value: &str, changed: usize) {
        let formatted_value = if changed == 0 { value.green() } else { value.yellow() };
        println!("  {} {}", format!("{}:", name).bright_black(), formatted_value);
    }

    fn print_flag(name: &str, value: bool) {
        let formatted_value = if value { "yes".green() } else { "no".red() };
        println!("  {} {}", format!("{}:", name).bright_black(), formatted_value);
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(
            Reporter::format_duration(Duration::from_micros(500)),
            "500µs"
        );
        assert_eq!(
            Reporter::format_duration(Duration::from_millis(5)),
            "5.00ms"
        );
        assert_eq!(Reporter::format_duration(Duration::from_secs(2)), "2.00s");
    }
}
