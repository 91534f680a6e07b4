#[derive(Clone, Copy)]
pub enum Width {
    Fixed(usize),
    Auto,
    ExpandWithMin(usize),
}
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Center,
    Right,
}
#[derive(Clone, Copy)]
pub enum Truncate {
    Left,  //  Remove left-most characters
    Right, //  Remove right-most characters
}
#[derive(Clone, Copy)]
pub enum ColumnFooter {
    Show,
    Hide,
}

pub struct Column<'a, TRow, TCol> {
    align: Align,
    truncate: Truncate,
    width: Width,
    footer: ColumnFooter,
    title: Option<String>,
    data: TCol,
    get_content: &'a dyn Fn(&TRow, &TCol) -> String,
    show_indent: bool,

    min_width: usize,
    computed_width: usize,
}
impl<'a, TRow, TCol> Column<'a, TRow, TCol> {
    pub fn new(
        data: TCol,
        get_content: &'a dyn Fn(&TRow, &TCol) -> String,
    ) -> Self {
        Self {
            align: Align::Left,
            truncate: Truncate::Right,
            width: Width::Auto,
            footer: ColumnFooter::Show,
            title: None,
            computed_width: 0,
            min_width: 0,
            show_indent: false,
            data,
            get_content,
        }
    }

    // Whether this column should show the indentation
    pub fn show_indent(mut self) -> Self {
        self.show_indent = true;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_footer(mut self, footer: ColumnFooter) -> Self {
        self.footer = footer;
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_truncate(mut self, truncate: Truncate) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    /// A right-aligned column, as used for amounts
    pub fn amount(self, title: &str) -> Self {
        self.with_title(title)
            .with_align(Align::Right)
            .with_truncate(Truncate::Left)
    }

    fn content(&self, row: &TRow) -> String {
        (self.get_content)(row, &self.data)
    }

    fn title_width(&self) -> usize {
        self.title.as_ref().map_or(0, |t| t.chars().count())
    }
}

#[derive(Debug)]
enum RowData {
    Separator,
    Cells(usize, Vec<String>), //  first component is the indent
    Headers,
}

#[derive(Clone)]
pub struct Settings {
    pub colsep: String,
    pub indent_size: usize,
}
impl Default for Settings {
    fn default() -> Self {
        Settings {
            colsep: "│".to_string(),
            indent_size: 2,
        }
    }
}

pub struct Table<'a, TRow, TCol> {
    columns: Vec<Column<'a, TRow, TCol>>,
    rows: Vec<RowData>,
    title: Option<String>,
    settings: Settings,
}
impl<'a, TRow, TCol> Table<'a, TRow, TCol> {
    pub fn new(
        columns: Vec<Column<'a, TRow, TCol>>,
        settings: &Settings,
    ) -> Self {
        Self {
            rows: Vec::new(),
            columns,
            title: None,
            settings: settings.clone(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_col_headers(mut self) -> Self {
        self.rows.push(RowData::Headers);
        self.rows.push(RowData::Separator);
        self
    }

    pub fn add_rows(&mut self, rows: &[TRow], indent: usize) {
        for row in rows {
            self.add_row(row, indent);
        }
    }

    pub fn add_row(&mut self, row: &TRow, indent: usize) {
        self.rows.push(RowData::Cells(
            indent,
            self.columns.iter().map(|col| col.content(row)).collect(),
        ));
    }

    pub fn add_separator(&mut self) {
        self.rows.push(RowData::Separator);
    }

    /// A separator followed by a row where only some columns are shown.
    pub fn add_footer(&mut self, total: &TRow) {
        self.rows.push(RowData::Separator);
        self.rows.push(RowData::Cells(
            0,
            self.columns
                .iter()
                .map(|col| match col.footer {
                    ColumnFooter::Hide => String::new(),
                    ColumnFooter::Show => col.content(total),
                })
                .collect(),
        ));
    }

    /// The widest cell in a column, including indentation.  Returns the
    /// width and the minimal width requested for the column.
    fn natural_width(&self, colidx: usize, col_min: usize) -> (usize, usize) {
        let Some(col) = self.columns.get(colidx) else {
            return (0, 0);
        };
        let mut w = 0;
        let mut min = 0;
        for row in &self.rows {
            let cell = match row {
                RowData::Separator => 0,
                RowData::Headers => col.title_width(),
                RowData::Cells(indent, cells) => {
                    let idt = if col.show_indent {
                        indent * self.settings.indent_size
                    } else {
                        0
                    };
                    min = min.max(idt + col_min);
                    idt + cells.get(colidx).map_or(0, |c| c.chars().count())
                }
            };
            w = w.max(cell);
        }
        (w, min)
    }

    /// Compute the size allocated for each column.
    /// max_width should not include the space for column separators.
    fn compute_widths(&mut self, max_width: usize) {
        let mut expandable_count: usize = 0;
        let mut expandable_width: usize = 0;
        let mut fixed_width: usize = 0; // minimal requested width

        for colidx in 0..self.columns.len() {
            let width = match self.columns.get(colidx) {
                None => continue,
                Some(col) => col.width,
            };
            let (computed, min) = match width {
                Width::Fixed(w) => (w, w),
                Width::Auto => {
                    let (w, _) = self.natural_width(colidx, 0);
                    (w, w)
                }
                Width::ExpandWithMin(col_min) => {
                    let (w, min) = self.natural_width(colidx, col_min);
                    expandable_width += w;
                    expandable_count += 1;
                    (w, min)
                }
            };
            fixed_width += min;
            if let Some(col) = self.columns.get_mut(colidx) {
                col.computed_width = computed;
                col.min_width = min;
            }
        }

        if expandable_width + fixed_width > max_width {
            if fixed_width > max_width {
                // Screen is too narrow, so all expandable columns get their
                // minimal size, and rows will wrap.
                for col in self.columns.iter_mut() {
                    if let Width::ExpandWithMin(_) = col.width {
                        col.computed_width = col.min_width;
                    }
                }
            } else {
                // Divide the extra space amongst all expandable columns
                let adjust = (max_width - fixed_width) / expandable_count.max(1);
                for col in self.columns.iter_mut() {
                    if let Width::ExpandWithMin(_) = col.width {
                        col.computed_width = (col.min_width + adjust)
                            .min(col.computed_width);
                    }
                }
            }
        }
    }

    pub fn to_string(&mut self, max_width: usize) -> String {
        let seps = self.columns.len().saturating_sub(1)
            * self.settings.colsep.chars().count();
        self.compute_widths(max_width.saturating_sub(seps));
        let mut result = String::new();

        if let Some(title) = &self.title {
            let width = self.columns.iter().map(|c| c.computed_width).sum::<usize>()
                + seps;
            push_align(&mut result, title, width, Align::Center, 0);
            result.push('\n');
        }

        for row in &self.rows {
            for (colidx, col) in self.columns.iter().enumerate() {
                match row {
                    RowData::Separator => {
                        push_sep(&mut result, col.computed_width);
                    }
                    RowData::Headers => {
                        push_align(
                            &mut result,
                            truncate(
                                col.title.as_deref().unwrap_or_default(),
                                col.truncate,
                                col.computed_width,
                            ),
                            col.computed_width,
                            Align::Center,
                            0,
                        );
                    }
                    RowData::Cells(indent, cells) => {
                        let idt = if col.show_indent {
                            *indent * self.settings.indent_size
                        } else {
                            0
                        };
                        let width = col.computed_width.saturating_sub(idt);
                        push_align(
                            &mut result,
                            truncate(
                                cells.get(colidx).map_or("", String::as_str),
                                col.truncate,
                                width,
                            ),
                            width,
                            col.align,
                            idt,
                        );
                    }
                }

                if colidx + 1 < self.columns.len() {
                    result.push_str(&self.settings.colsep);
                }
            }
            result.push('\n');
        }

        result
    }
}

fn trunc_keep_last(s: &str, max_width: usize) -> &str {
    if max_width == 0 {
        return "";
    }
    s.char_indices()
        .rev()
        .nth(max_width - 1)
        .and_then(|(i, _)| s.get(i..))
        .unwrap_or(s)
}
fn trunc_keep_first(s: &str, max_width: usize) -> &str {
    s.char_indices()
        .nth(max_width)
        .and_then(|(i, _)| s.get(..i))
        .unwrap_or(s)
}
fn push_sep(into: &mut String, width: usize) {
    into.push_str(&"─".repeat(width));
}
fn push_align(
    into: &mut String,
    value: &str,
    width: usize,
    align: Align,
    indent_chars: usize,
) {
    if indent_chars > 0 {
        into.push_str(&" ".repeat(indent_chars));
    }

    match align {
        Align::Left => into.push_str(&format!("{:<width$}", value)),
        Align::Center => into.push_str(&format!("{:^width$}", value)),
        Align::Right => into.push_str(&format!("{:>width$}", value)),
    }
}

/// Truncate the string if necessary
fn truncate(val: &str, truncate: Truncate, width: usize) -> &str {
    if val.chars().count() <= width {
        val
    } else {
        match truncate {
            Truncate::Right => trunc_keep_first(val, width),
            Truncate::Left => trunc_keep_last(val, width),
        }
    }
}
