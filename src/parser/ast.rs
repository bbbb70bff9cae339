// Commands understood by an interactive session

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Load a CSV or Excel file from disk
    Upload(String),
    /// Choose the x-axis column
    SelectX(String),
    /// Choose the y-axis column
    SelectY(String),
    /// Choose the chart kind by tag (`scatter`, `bar`, ...)
    Kind(String),
    /// List the current dataset's columns
    Columns,
    /// Print the current selection and output status
    Show,
    /// Write the HTML page; `None` uses the configured output path
    Save(Option<String>),
    Help,
    Quit,
}
