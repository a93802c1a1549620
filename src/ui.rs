//! Salida de terminal para el binario de demostración.
//!
//! Usa `indicatif` para el spinner de progreso y `console` para los estilos
//! de color. [`DemoProgress`] acompaña visualmente el recorrido de un
//! crédito por el flujo de trabajo.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::model::CreditHistoryEntry;

/// Indicador visual del recorrido de un crédito en el terminal.
pub struct DemoProgress {
    pb: ProgressBar,
    green: Style,
    cyan: Style,
    dim: Style,
}

impl DemoProgress {
    /// Arranca el spinner con una etiqueta inicial.
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(label.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            cyan: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Actualiza el mensaje del spinner al estado actual del crédito.
    pub fn state(&self, state_name: &str) {
        self.pb.set_message(format!("Estado: {state_name}"));
    }

    /// Imprime una línea informativa sin detener el spinner.
    pub fn note(&self, message: &str) {
        self.pb
            .println(format!("  {} {message}", self.cyan.apply_to("›")));
    }

    /// Detiene el spinner con un mensaje de cierre.
    pub fn finish(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    /// Imprime el historial del crédito, más reciente primero.
    pub fn print_history(&self, history: &[CreditHistoryEntry]) {
        println!();
        println!("{}", self.cyan.apply_to("─── Historial ───"));
        let mut entries: Vec<&CreditHistoryEntry> = history.iter().collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for entry in entries {
            println!(
                "  {} [{}] {}",
                self.dim.apply_to(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
                entry.action,
                entry.description
            );
        }
    }
}
