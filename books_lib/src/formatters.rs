use rust_decimal::{Decimal, RoundingStrategy};

/// The currency all amounts are given in.
#[derive(Clone, Debug)]
pub struct Currency {
    // e.g. "$", "EUR", "€"
    pub symbol: String,

    // Whether to display the symbol after the value
    pub symbol_after: bool,

    // Number of digits in the fractional part
    pub precision: u8,
}

impl Default for Currency {
    fn default() -> Self {
        Currency {
            symbol: "$".to_string(),
            symbol_after: false,
            precision: 2,
        }
    }
}

impl Currency {
    pub fn new(symbol: &str, symbol_after: bool, precision: u8) -> Self {
        Currency {
            symbol: symbol.trim().to_string(),
            symbol_after,
            precision,
        }
    }

    /// Round a computed amount to the precision of the currency
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(
            self.precision as u32,
            RoundingStrategy::MidpointNearestEven,
        )
    }
}

/// How to display negative values
#[derive(Clone, Copy, Default, Debug)]
pub enum Negative {
    #[default]
    MinusSign, // $ -123
    Parenthesis,  // $ (123)
    SeparateSign, // -$ 123
}

/// How to display large numbers
#[derive(Clone, Copy, Debug)]
pub enum Separators {
    None,              // no special formatting    1234456.789
    Every3Digit(char), // char every 3 digits      1,234,456.789
}
impl Default for Separators {
    fn default() -> Self {
        Separators::Every3Digit(',')
    }
}

/// How to display zero values
#[derive(Clone, Copy, Debug)]
pub enum Zero {
    Empty,                 // display nothing
    Replace(&'static str), // display a specific text instead (e.g. "-")
}

#[derive(Clone, Debug)]
pub struct Formatter {
    pub currency: Currency,
    pub hide_symbol: bool,
    pub negative: Negative,
    pub separators: Separators,
    pub comma: char,
    pub zero: Zero,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            hide_symbol: false,
            comma: '.',
            negative: Negative::default(),
            separators: Separators::default(),
            zero: Zero::Empty,
        }
    }
}

impl Formatter {
    /// Display the absolute value of value
    fn push_abs_num(&self, into: &mut String, value: Decimal) {
        let precision = self.currency.precision;
        let rounded = value.abs().round_dp_with_strategy(
            precision as u32,
            RoundingStrategy::MidpointNearestEven,
        );
        let text = rounded.to_string();
        let (int_part, frac_part) = match text.split_once('.') {
            None => (text.as_str(), ""),
            Some((i, f)) => (i, f),
        };

        match self.separators {
            Separators::None => into.push_str(int_part),
            Separators::Every3Digit(sep) => {
                let len = int_part.chars().count();
                for (idx, p) in int_part.chars().enumerate() {
                    if idx > 0 && (len - idx) % 3 == 0 {
                        into.push(sep);
                    }
                    into.push(p);
                }
            }
        }

        if precision > 0 {
            into.push(self.comma);
            into.push_str(frac_part);
            for _ in frac_part.len()..precision as usize {
                into.push('0');
            }
        }
    }

    fn push_zero(&self, into: &mut String) {
        match self.zero {
            Zero::Empty => {}
            Zero::Replace(z) => into.push_str(z),
        }
    }

    /// Display an amount.  Zero is displayed as configured (nothing by
    /// default).
    pub fn display(&self, value: Decimal) -> String {
        let mut buffer = String::new();
        self.push(&mut buffer, value);
        buffer
    }

    /// Display an amount, always showing zero as a number.  This is used
    /// for totals, where an empty cell would be confusing.
    pub fn display_total(&self, value: Decimal) -> String {
        if self.currency.round(value).is_zero() {
            let mut buffer = String::new();
            self.push_unsigned(&mut buffer, Decimal::ZERO);
            buffer
        } else {
            self.display(value)
        }
    }

    fn push_unsigned(&self, into: &mut String, value: Decimal) {
        if self.hide_symbol {
            self.push_abs_num(into, value);
        } else if self.currency.symbol_after {
            self.push_abs_num(into, value);
            into.push(' ');
            into.push_str(&self.currency.symbol);
        } else {
            into.push_str(&self.currency.symbol);
            into.push(' ');
            self.push_abs_num(into, value);
        }
    }

    pub fn push(&self, into: &mut String, value: Decimal) {
        if self.currency.round(value).is_zero() {
            self.push_zero(into);
            return;
        }
        if !value.is_sign_negative() {
            self.push_unsigned(into, value);
            return;
        }

        if self.hide_symbol {
            match self.negative {
                Negative::MinusSign | Negative::SeparateSign => {
                    into.push('-');
                    self.push_abs_num(into, value);
                }
                Negative::Parenthesis => {
                    into.push('(');
                    self.push_abs_num(into, value);
                    into.push(')');
                }
            }
        } else if !self.currency.symbol_after {
            match self.negative {
                Negative::SeparateSign => {
                    into.push('-');
                    into.push_str(&self.currency.symbol);
                    into.push(' ');
                    self.push_abs_num(into, value);
                }
                Negative::MinusSign => {
                    into.push_str(&self.currency.symbol);
                    into.push_str(" -");
                    self.push_abs_num(into, value);
                }
                Negative::Parenthesis => {
                    into.push_str(&self.currency.symbol);
                    into.push_str(" (");
                    self.push_abs_num(into, value);
                    into.push(')');
                }
            }
        } else {
            match self.negative {
                Negative::SeparateSign | Negative::MinusSign => {
                    into.push('-');
                    self.push_abs_num(into, value);
                }
                Negative::Parenthesis => {
                    into.push('(');
                    self.push_abs_num(into, value);
                    into.push(')');
                }
            }
            into.push(' ');
            into.push_str(&self.currency.symbol);
        }
    }
}
