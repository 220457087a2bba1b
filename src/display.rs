use std::io::{Result, Stdout, Write, stdout};

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, MoveTo, Show},
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tracing::warn;

use crate::network::WorldView;
use crate::presenter::{Presenter, SimulationEvent};
use crate::station::CollectionReport;
use crate::types::Cell;

/// Screen layout, in terminal rows and columns
const TITLE_Y: u16 = 0;
const MAP_TOP: u16 = 2;
const MAP_LEFT: u16 = 2;

/// Terminal renderer. Keeps its own copy of the world, built from the
/// events it receives, and redraws only the cells an event touches.
pub struct TerminalDisplay {
    view: WorldView,
    stdout: Stdout,
    title: String,
}

impl TerminalDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            view: WorldView::new(),
            stdout: stdout(),
            title: title.into(),
        }
    }

    pub fn view(&self) -> &WorldView {
        &self.view
    }

    fn status_y(&self) -> u16 {
        MAP_TOP + self.view.size as u16 + 3
    }

    fn handle(&mut self, event: &SimulationEvent) -> Result<()> {
        self.view.apply(event);
        match event {
            SimulationEvent::WorldLoaded { .. } => self.draw_all()?,
            SimulationEvent::RobotLeft { x, y } | SimulationEvent::HomeRestored { x, y } => {
                self.draw_cell(*x, *y)?;
            }
            SimulationEvent::RobotPlaced { .. } | SimulationEvent::RobotRotated { .. } => {
                self.draw_robot()?;
                self.draw_status()?;
            }
            SimulationEvent::MarkerCollected { .. } => self.draw_status()?,
            SimulationEvent::RunFinished {
                collected,
                unreachable,
            } => self.draw_finish(*collected, *unreachable)?,
        }
        self.stdout.flush()
    }

    fn draw_all(&mut self) -> Result<()> {
        let size = self.view.size as u16;
        self.stdout.execute(Hide)?;
        self.stdout.execute(Clear(ClearType::All))?;

        self.stdout.execute(MoveTo(0, TITLE_Y))?;
        self.stdout.execute(SetForegroundColor(Color::Cyan))?;
        self.stdout.execute(Print(&self.title))?;

        // NOTE - Frame around the grid, each cell is two columns wide
        let width = size as usize * 2;
        self.stdout.execute(SetForegroundColor(Color::DarkGrey))?;
        self.stdout.execute(MoveTo(MAP_LEFT - 1, MAP_TOP))?;
        self.stdout.execute(Print(format!("╔{}╗", "═".repeat(width))))?;
        for y in 0..size {
            self.stdout.execute(MoveTo(MAP_LEFT - 1, MAP_TOP + 1 + y))?;
            self.stdout.execute(Print(format!("║{}║", " ".repeat(width))))?;
        }
        self.stdout.execute(MoveTo(MAP_LEFT - 1, MAP_TOP + 1 + size))?;
        self.stdout.execute(Print(format!("╚{}╝", "═".repeat(width))))?;

        for y in 0..self.view.size {
            for x in 0..self.view.size {
                self.draw_cell(x, y)?;
            }
        }
        self.draw_robot()?;
        self.draw_status()?;
        self.draw_legend()
    }

    fn move_to_cell(&mut self, x: usize, y: usize) -> Result<()> {
        self.stdout
            .execute(MoveTo(MAP_LEFT + x as u16 * 2, MAP_TOP + 1 + y as u16))?;
        Ok(())
    }

    fn draw_cell(&mut self, x: usize, y: usize) -> Result<()> {
        let Some(cell) = self.view.cell(x, y) else {
            return Ok(());
        };
        let (color, glyph) = match cell {
            Cell::Empty => (Color::DarkGrey, "· "),
            Cell::Home => (Color::Yellow, "[]"),
            Cell::Obstacle => (Color::DarkGrey, "██"),
            Cell::Marker => (Color::Blue, "◆ "),
            Cell::Collected => (Color::DarkGrey, "  "),
        };
        self.move_to_cell(x, y)?;
        self.stdout.execute(SetForegroundColor(color))?;
        self.stdout.execute(Print(glyph))?;
        self.stdout.execute(ResetColor)?;
        Ok(())
    }

    fn draw_robot(&mut self) -> Result<()> {
        let Some(robot) = self.view.robot else {
            return Ok(());
        };
        self.move_to_cell(robot.x, robot.y)?;
        self.stdout.execute(SetForegroundColor(Color::Green))?;
        self.stdout.execute(Print(robot.facing.arrow()))?;
        if robot.carrying {
            self.stdout.execute(SetForegroundColor(Color::Blue))?;
            self.stdout.execute(Print('◆'))?;
        } else {
            self.stdout.execute(Print(' '))?;
        }
        self.stdout.execute(ResetColor)?;
        Ok(())
    }

    fn draw_status(&mut self) -> Result<()> {
        let y = self.status_y();
        let line = match self.view.robot {
            Some(robot) => format!(
                "Delivered: {:>3} | Left: {:>3} | Robot: ({:>2},{:>2}) facing {:<5}{}",
                self.view.delivered(),
                self.view.markers_left(),
                robot.x,
                robot.y,
                robot.facing,
                if robot.carrying { " | carrying" } else { "" }
            ),
            None => String::new(),
        };
        self.stdout.execute(MoveTo(0, y))?;
        self.stdout.execute(SetForegroundColor(Color::White))?;
        self.stdout.execute(Print(format!("{line:<72}")))?;
        self.stdout.execute(ResetColor)?;
        Ok(())
    }

    fn draw_legend(&mut self) -> Result<()> {
        let y = self.status_y() + 1;
        self.stdout.execute(MoveTo(0, y))?;
        self.stdout.execute(SetForegroundColor(Color::Yellow))?;
        self.stdout.execute(Print("[] = Home   "))?;
        self.stdout.execute(SetForegroundColor(Color::Blue))?;
        self.stdout.execute(Print("◆ = Marker   "))?;
        self.stdout.execute(SetForegroundColor(Color::DarkGrey))?;
        self.stdout.execute(Print("██ = Obstacle   "))?;
        self.stdout.execute(SetForegroundColor(Color::Green))?;
        self.stdout.execute(Print("▶ = Robot"))?;
        self.stdout.execute(ResetColor)?;
        Ok(())
    }

    fn draw_finish(&mut self, collected: usize, unreachable: usize) -> Result<()> {
        let y = self.status_y() + 3;
        self.stdout.execute(MoveTo(0, y))?;
        self.stdout.execute(SetForegroundColor(Color::Green))?;
        self.stdout.execute(Print(format!(
            "All reachable markers have been collected: {collected} home, {unreachable} out of reach"
        )))?;
        self.stdout.execute(ResetColor)?;
        self.stdout.execute(MoveTo(0, y + 1))?;
        self.stdout.execute(Show)?;
        Ok(())
    }
}

impl Presenter for TerminalDisplay {
    fn notify(&mut self, event: &SimulationEvent) {
        if let Err(e) = self.handle(event) {
            warn!(error = %e, "terminal update failed");
        }
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = self.stdout.execute(ResetColor);
        let _ = self.stdout.execute(Show);
    }
}

/// Plain-text end-of-run summary, for headless runs.
pub fn render_summary(report: &CollectionReport, out: &mut impl Write) -> Result<()> {
    writeln!(out, "All reachable markers have been collected")?;
    writeln!(out, "  rounds:      {}", report.rounds)?;
    writeln!(out, "  delivered:   {}", report.collected.len())?;
    writeln!(out, "  steps:       {}", report.steps)?;
    writeln!(out, "  unreachable: {}", report.unreachable)?;
    Ok(())
}
