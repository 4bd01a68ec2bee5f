//! Simple CLI output implementation
//!
//! Renders store snapshots as plain terminal text.

use colored::{ColoredString, Colorize};

use crate::AppResult;
use crate::api::{Simulation, SimulationStatus, Step};
use crate::locale::Messages;

fn status_label(status: SimulationStatus, messages: &Messages) -> ColoredString {
    let label = messages.status(status);
    match status {
        SimulationStatus::Running => label.yellow(),
        SimulationStatus::Completed => label.green(),
        SimulationStatus::Failed => label.red(),
    }
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars {
        let truncated: String = line.chars().take(max_chars).collect();
        format!("{}…", truncated)
    } else {
        line.to_string()
    }
}

/// Display the simulation list, newest first
pub fn display_simulation_list(simulations: &[Simulation], messages: &Messages) -> AppResult<()> {
    println!("{}", messages.sessions_title.bold());
    if simulations.is_empty() {
        println!("   ({})", messages.no_sessions);
        return Ok(());
    }

    for (i, sim) in simulations.iter().enumerate() {
        println!(
            "   {}. {} [{}] {}",
            i + 1,
            sim.id.dimmed(),
            status_label(sim.status, messages),
            first_line(&sim.description, 60)
        );
    }

    Ok(())
}

/// Display the static part of a simulation
pub fn display_simulation_header(sim: &Simulation, messages: &Messages) -> AppResult<()> {
    println!("{} {}", "◆".cyan(), sim.id.bold());
    println!("   {}: {}", messages.description, sim.description);
    if !sim.preconditions.is_empty() {
        println!("   {}: {}", messages.preconditions, sim.preconditions);
    }
    println!(
        "   {}: {} · {} · {}",
        messages.rounds,
        sim.rounds,
        sim.language.code(),
        sim.depth.as_str()
    );

    if !sim.agents.is_empty() {
        let agents: Vec<String> = sim
            .agents
            .iter()
            .map(|agent| {
                if agent.role.is_empty() {
                    agent.name.clone()
                } else {
                    format!("{} ({})", agent.name, agent.role)
                }
            })
            .collect();
        println!("   {}: {}", messages.agents, agents.join(", "));
    }

    println!(
        "   {}: {}",
        messages.created,
        sim.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    Ok(())
}

/// Display one step of a simulation
pub fn display_step(step: &Step, messages: &Messages) -> AppResult<()> {
    let speaker = if step.agent_name.is_empty() {
        "—".to_string()
    } else {
        step.agent_name.clone()
    };

    println!(
        "{} {} · {}",
        format!("{} {}", messages.round, step.round).cyan(),
        speaker.bold(),
        step.timestamp.format("%H:%M:%S").to_string().dimmed()
    );
    println!("{}", step.content);
    println!();
    Ok(())
}

/// Display the outcome of a simulation
pub fn display_outcome(sim: &Simulation, messages: &Messages) -> AppResult<()> {
    println!("[{}]", status_label(sim.status, messages));
    if let Some(result) = &sim.final_result {
        println!("{}", messages.final_result.bold());
        println!("{}", result);
    }
    Ok(())
}

/// Display a whole simulation at once
pub fn display_simulation(sim: &Simulation, messages: &Messages) -> AppResult<()> {
    display_simulation_header(sim, messages)?;

    if sim.steps.is_empty() && sim.status == SimulationStatus::Running {
        println!("   ({})", messages.no_steps);
    }
    for step in &sim.steps {
        display_step(step, messages)?;
    }

    display_outcome(sim, messages)
}

pub fn display_info(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn display_error(message: &str, messages: &Messages) {
    eprintln!("{} {}: {}", "✗".red(), messages.error, message);
}
