use mm15::mach::Interp;

/// Evaluates one line and returns what the shell would show: the stack
/// display on success, the error text on failure.
pub fn eval(interp: &mut Interp, line: &str) -> String {
    match interp.evaluate_line(line) {
        Ok(()) => render(interp),
        Err(error) => format!("{}\n", error),
    }
}

/// The automatic stack display, bottom first, labelled by depth.
pub fn render(interp: &Interp) -> String {
    let mut s = String::new();
    let len = interp.stack.len();
    for (i, val) in interp.stack.iter().enumerate() {
        s.push_str(&format!(
            "{}: {}\n",
            len - 1 - i,
            val.render(interp.precision, interp.fixed_point)
        ));
    }
    s
}
