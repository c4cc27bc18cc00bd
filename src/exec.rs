//! Backtracking matcher.
//!
//! Executes a compiled program against an input buffer: single-threaded,
//! depth-first, with one instruction pointer, one input position, a small
//! integer stack for quantifier counters, the capture array, and a
//! grow-only stack of backtrack frames.
//!
//! Backtracking order is deterministic: the same program and input always
//! explore the same state sequence. Cancellation is cooperative: an
//! interrupt counter decrements on jumps, loop iterations, state pops and
//! greedy-quantifier iterations, and periodically polls the host.

use crate::bytecode::{self, header, read_i32, read_u16, read_u32, Op};
use crate::charclass::is_word_char;
use crate::error::ExecError;
use crate::flags::Flags;
use crate::host::Host;
use crate::input::{CharBuf, Input, Latin1Buf, Ucs2Buf, Utf16Buf, Utf8Buf};
use serde::{Deserialize, Serialize};

/// Instructions between two host timeout polls.
const INTERRUPT_COUNTER_INIT: u32 = 10_000;

/// Quantifier bound standing for infinity.
const QUANT_INFINITY: u32 = i32::MAX as u32;

/// Sentinel for an unset capture slot.
const NO_POSITION: usize = usize::MAX;

/// Slots per backtrack frame before the capture and counter snapshots.
const FRAME_HEADER_SLOTS: usize = 5;

const FRAME_TYPE: usize = 0;
const FRAME_COUNT: usize = 1;
const FRAME_STACK_LEN: usize = 2;
const FRAME_CPTR: usize = 3;
const FRAME_PC: usize = 4;

const TYPE_SPLIT: usize = 0;
const TYPE_LOOKAHEAD: usize = 1;
const TYPE_NEGATIVE_LOOKAHEAD: usize = 2;
const TYPE_GREEDY_QUANT: usize = 3;

/// A half-open `[start, end)` span in input units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// First unit of the span.
    pub start: usize,
    /// One past the last unit.
    pub end: usize,
}

/// A successful match: one optional span per capture index, plus the
/// group-name table when the program carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Capture spans; index 0 is the whole match.
    pub captures: Vec<Option<Span>>,
    /// One entry per capture index starting at 1; empty when the program
    /// has no named groups.
    pub group_names: Vec<Option<String>>,
}

impl MatchReport {
    /// Span of the named group, if that group participated in the match.
    pub fn named(&self, name: &str) -> Option<Span> {
        let slot = self
            .group_names
            .iter()
            .position(|n| n.as_deref() == Some(name))?;
        self.captures.get(slot + 1).copied().flatten()
    }
}

fn is_line_terminator(c: u32) -> bool {
    c == 0x0A || c == 0x0D || c == 0x2028 || c == 0x2029
}

enum Status {
    Matched,
    NotMatched,
    /// "No-recurse" inner mode: the body matched and the input position
    /// advanced to this offset.
    Advanced(usize),
}

struct ExecContext<'a, H: Host + ?Sized> {
    host: &'a mut H,
    capture_count: usize,
    multiline: bool,
    ignore_case: bool,
    is_unicode: bool,
    interrupt_counter: u32,
    /// Fixed frame stride for this execution.
    frame_slots: usize,
    /// Flat backtrack-frame arena.
    state: Vec<usize>,
}

impl<'a, H: Host + ?Sized> ExecContext<'a, H> {
    fn poll_timeout(&mut self) -> Result<(), ExecError> {
        self.interrupt_counter -= 1;
        if self.interrupt_counter == 0 {
            self.interrupt_counter = INTERRUPT_COUNTER_INIT;
            if self.host.check_timeout() {
                return Err(ExecError::Timeout);
            }
        }
        Ok(())
    }

    fn canon(&self, c: u32) -> u32 {
        if self.ignore_case {
            self.host.canonicalize(c, self.is_unicode)
        } else {
            c
        }
    }

    fn frames(&self) -> usize {
        self.state.len() / self.frame_slots
    }

    fn top(&self) -> usize {
        self.state.len() - self.frame_slots
    }

    fn pop_frame(&mut self) {
        let new_len = self.state.len() - self.frame_slots;
        self.state.truncate(new_len);
    }

    fn push_state(
        &mut self,
        capture: &[usize],
        stack: &[usize],
        stack_len: usize,
        pc: usize,
        cptr: usize,
        frame_type: usize,
        count: usize,
    ) -> Result<(), ExecError> {
        let frames = self.frames();
        let cap_frames = self.state.capacity() / self.frame_slots;
        if frames + 1 > cap_frames {
            let mut new_frames = cap_frames * 3 / 2;
            if new_frames < 8 {
                new_frames = 8;
            }
            let bytes = new_frames * self.frame_slots * std::mem::size_of::<usize>();
            if bytes > self.host.state_memory_limit() {
                return Err(ExecError::MemoryLimit);
            }
            self.state
                .reserve_exact(new_frames * self.frame_slots - self.state.len());
        }
        self.state.push(frame_type);
        self.state.push(count);
        self.state.push(stack_len);
        self.state.push(cptr);
        self.state.push(pc);
        self.state.extend_from_slice(&capture[..2 * self.capture_count]);
        self.state.extend_from_slice(&stack[..stack_len]);
        // Pad so every frame has the same stride.
        let pad = self.frame_slots - FRAME_HEADER_SLOTS - 2 * self.capture_count - stack_len;
        for _ in 0..pad {
            self.state.push(0);
        }
        Ok(())
    }

    /// Restore the capture snapshot of the top frame.
    fn restore_captures(&self, capture: &mut [usize]) {
        let base = self.top() + FRAME_HEADER_SLOTS;
        capture[..2 * self.capture_count]
            .copy_from_slice(&self.state[base..base + 2 * self.capture_count]);
    }

    /// Restore the counter-stack snapshot of the top frame; returns the
    /// restored depth.
    fn restore_stack(&self, stack: &mut [usize]) -> usize {
        let top = self.top();
        let stack_len = self.state[top + FRAME_STACK_LEN];
        let base = top + FRAME_HEADER_SLOTS + 2 * self.capture_count;
        stack[..stack_len].copy_from_slice(&self.state[base..base + stack_len]);
        stack_len
    }
}

/// One backtracking execution over a monomorphised input buffer.
#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
fn exec_backtrack<B: CharBuf, H: Host + ?Sized>(
    ctx: &mut ExecContext<'_, H>,
    buf: &B,
    capture: &mut [usize],
    stack: &mut [usize],
    mut stack_len: usize,
    bc: &[u8],
    mut pc: usize,
    mut cptr: usize,
    no_recurse: bool,
) -> Result<Status, ExecError> {
    'restart: loop {
        // Execute instructions until the thread settles.
        let outcome = 'run: loop {
            let op = Op::from_u8(bc[pc]).expect("corrupt bytecode: unknown opcode");
            pc += 1;
            match op {
                Op::Match => {
                    if no_recurse {
                        return Ok(Status::Advanced(cptr));
                    }
                    break 'run true;
                }
                Op::Char8 | Op::Char16 | Op::Char32 => {
                    let val = match op {
                        Op::Char8 => {
                            let v = bc[pc] as u32;
                            pc += 1;
                            v
                        }
                        Op::Char16 => {
                            let v = read_u16(bc, pc) as u32;
                            pc += 2;
                            v
                        }
                        _ => {
                            let v = read_u32(bc, pc);
                            pc += 4;
                            v
                        }
                    };
                    if cptr >= buf.len() {
                        break 'run false;
                    }
                    let (c, next) = buf.next(cptr);
                    cptr = next;
                    if ctx.canon(c) != val {
                        break 'run false;
                    }
                }
                Op::Dot => {
                    if cptr >= buf.len() {
                        break 'run false;
                    }
                    let (c, next) = buf.next(cptr);
                    cptr = next;
                    if is_line_terminator(c) {
                        break 'run false;
                    }
                }
                Op::Any => {
                    if cptr >= buf.len() {
                        break 'run false;
                    }
                    cptr = buf.next(cptr).1;
                }
                Op::LineStart => {
                    if cptr == 0 {
                        continue;
                    }
                    if !ctx.multiline {
                        break 'run false;
                    }
                    if !is_line_terminator(buf.peek_prev(cptr)) {
                        break 'run false;
                    }
                }
                Op::LineEnd => {
                    if cptr == buf.len() {
                        continue;
                    }
                    if !ctx.multiline {
                        break 'run false;
                    }
                    if !is_line_terminator(buf.peek(cptr)) {
                        break 'run false;
                    }
                }
                Op::Goto => {
                    let disp = read_i32(bc, pc);
                    pc = offset_pc(pc + 4, disp);
                    ctx.poll_timeout()?;
                }
                Op::SplitGotoFirst | Op::SplitNextFirst => {
                    let disp = read_i32(bc, pc);
                    pc += 4;
                    let jump = offset_pc(pc, disp);
                    let pushed = if op == Op::SplitNextFirst {
                        jump
                    } else {
                        let fall_through = pc;
                        pc = jump;
                        fall_through
                    };
                    ctx.push_state(capture, stack, stack_len, pushed, cptr, TYPE_SPLIT, 0)?;
                }
                Op::Lookahead | Op::NegativeLookahead => {
                    let disp = read_i32(bc, pc);
                    pc += 4;
                    let resume = offset_pc(pc, disp);
                    let ty = if op == Op::Lookahead {
                        TYPE_LOOKAHEAD
                    } else {
                        TYPE_NEGATIVE_LOOKAHEAD
                    };
                    ctx.push_state(capture, stack, stack_len, resume, cptr, ty, 0)?;
                }
                Op::SaveStart | Op::SaveEnd => {
                    let group = bc[pc] as usize;
                    pc += 1;
                    debug_assert!(group < ctx.capture_count);
                    let slot = 2 * group + usize::from(op == Op::SaveEnd);
                    capture[slot] = cptr;
                }
                Op::SaveReset => {
                    let first = bc[pc] as usize;
                    let last = bc[pc + 1] as usize;
                    pc += 2;
                    debug_assert!(last < ctx.capture_count);
                    for group in first..=last {
                        capture[2 * group] = NO_POSITION;
                        capture[2 * group + 1] = NO_POSITION;
                    }
                }
                Op::PushI32 => {
                    let val = read_u32(bc, pc);
                    pc += 4;
                    stack[stack_len] = val as usize;
                    stack_len += 1;
                }
                Op::Drop => {
                    stack_len -= 1;
                }
                Op::Loop => {
                    let disp = read_i32(bc, pc);
                    pc += 4;
                    stack[stack_len - 1] -= 1;
                    if stack[stack_len - 1] != 0 {
                        pc = offset_pc(pc, disp);
                        ctx.poll_timeout()?;
                    }
                }
                Op::PushCharPos => {
                    stack[stack_len] = cptr;
                    stack_len += 1;
                }
                Op::CheckAdvance => {
                    stack_len -= 1;
                    if stack[stack_len] == cptr {
                        break 'run false;
                    }
                }
                Op::WordBoundary | Op::NotWordBoundary => {
                    let before = cptr > 0 && is_word_char(buf.peek_prev(cptr));
                    let after = cptr < buf.len() && is_word_char(buf.peek(cptr));
                    if (before != after) != (op == Op::WordBoundary) {
                        break 'run false;
                    }
                }
                Op::BackReference | Op::BackwardBackReference => {
                    let group = bc[pc] as usize;
                    pc += 1;
                    if group >= ctx.capture_count {
                        break 'run false;
                    }
                    let start = capture[2 * group];
                    let end = capture[2 * group + 1];
                    if start == NO_POSITION || end == NO_POSITION {
                        // An unset capture matches the empty string.
                        continue;
                    }
                    if op == Op::BackReference {
                        let mut from = start;
                        let mut matched = true;
                        while from < end {
                            if cptr >= buf.len() {
                                matched = false;
                                break;
                            }
                            let (c1, f_next) = buf.next(from);
                            let (c2, c_next) = buf.next(cptr);
                            from = f_next;
                            cptr = c_next;
                            if ctx.canon(c1) != ctx.canon(c2) {
                                matched = false;
                                break;
                            }
                        }
                        if !matched {
                            break 'run false;
                        }
                    } else {
                        // Walk the captured text end-to-start.
                        let mut from = end;
                        let mut matched = true;
                        while from > start {
                            if cptr == 0 {
                                matched = false;
                                break;
                            }
                            let (c1, f_prev) = buf.prev_char(from);
                            let (c2, c_prev) = buf.prev_char(cptr);
                            from = f_prev;
                            cptr = c_prev;
                            if ctx.canon(c1) != ctx.canon(c2) {
                                matched = false;
                                break;
                            }
                        }
                        if !matched {
                            break 'run false;
                        }
                    }
                }
                Op::Range => {
                    let pairs = read_u16(bc, pc) as usize;
                    pc += 2;
                    if cptr >= buf.len() {
                        break 'run false;
                    }
                    let (raw, next) = buf.next(cptr);
                    cptr = next;
                    let c = ctx.canon(raw);
                    let lo16 = |i: usize| read_u16(bc, pc + i * 4) as u32;
                    let hi16 = |i: usize| read_u16(bc, pc + i * 4 + 2) as u32;
                    let last_high = hi16(pairs - 1);
                    // 0xFFFF as the final high means +infinity.
                    let hit = if c >= 0xFFFF && last_high == 0xFFFF {
                        true
                    } else if c < lo16(0) || c > last_high {
                        false
                    } else {
                        range_search(c, pairs, lo16, hi16)
                    };
                    if !hit {
                        break 'run false;
                    }
                    pc += 4 * pairs;
                }
                Op::Range32 => {
                    let pairs = read_u16(bc, pc) as usize;
                    pc += 2;
                    if cptr >= buf.len() {
                        break 'run false;
                    }
                    let (raw, next) = buf.next(cptr);
                    cptr = next;
                    let c = ctx.canon(raw);
                    let lo32 = |i: usize| read_u32(bc, pc + i * 8);
                    let hi32 = |i: usize| read_u32(bc, pc + i * 8 + 4);
                    let hit = if c < lo32(0) || c > hi32(pairs - 1) {
                        false
                    } else {
                        range_search(c, pairs, lo32, hi32)
                    };
                    if !hit {
                        break 'run false;
                    }
                    pc += 8 * pairs;
                }
                Op::Prev => {
                    if cptr == 0 {
                        break 'run false;
                    }
                    cptr = buf.back(cptr);
                }
                Op::SimpleGreedyQuant => {
                    let operand = pc;
                    let next_off = read_i32(bc, pc);
                    let quant_min = read_u32(bc, pc + 4);
                    let quant_max = read_u32(bc, pc + 8);
                    pc += 16;
                    let body_pc = pc;
                    pc = offset_pc(pc, next_off);

                    let mut q: u32 = 0;
                    loop {
                        ctx.poll_timeout()?;
                        match exec_backtrack(
                            ctx, buf, capture, stack, stack_len, bc, body_pc, cptr, true,
                        )? {
                            Status::Advanced(advanced) => {
                                cptr = advanced;
                                q += 1;
                                if q >= quant_max && quant_max != QUANT_INFINITY {
                                    break;
                                }
                            }
                            Status::NotMatched => break,
                            Status::Matched => unreachable!("inner mode returns positions"),
                        }
                    }
                    if q < quant_min {
                        break 'run false;
                    }
                    if q > quant_min {
                        // Allow stepping back one iteration at a time.
                        ctx.push_state(
                            capture,
                            stack,
                            stack_len,
                            operand,
                            cptr,
                            TYPE_GREEDY_QUANT,
                            (q - quant_min) as usize,
                        )?;
                    }
                }
                Op::Invalid => panic!("corrupt bytecode: invalid opcode"),
            }
        };

        if no_recurse {
            // Simple bodies never push frames; a failure is final.
            debug_assert!(!outcome);
            return Ok(Status::NotMatched);
        }

        // Unwind the backtrack stack with the settled outcome.
        let mut ret = outcome;
        loop {
            ctx.poll_timeout()?;
            if ctx.frames() == 0 {
                return Ok(if ret { Status::Matched } else { Status::NotMatched });
            }
            let top = ctx.top();
            let frame_type = ctx.state[top + FRAME_TYPE];
            match frame_type {
                TYPE_SPLIT => {
                    if !ret {
                        ctx.restore_captures(capture);
                        stack_len = ctx.restore_stack(stack);
                        pc = ctx.state[top + FRAME_PC];
                        cptr = ctx.state[top + FRAME_CPTR];
                        ctx.pop_frame();
                        continue 'restart;
                    }
                    ctx.pop_frame();
                }
                TYPE_GREEDY_QUANT => {
                    if !ret {
                        ctx.restore_captures(capture);
                        stack_len = ctx.restore_stack(stack);
                        let operand = ctx.state[top + FRAME_PC];
                        cptr = ctx.state[top + FRAME_CPTR];
                        // Give back one iteration.
                        let char_count = read_u32(bc, operand + 12);
                        for _ in 0..char_count {
                            cptr = buf.back(cptr);
                        }
                        pc = offset_pc(operand + 16, read_i32(bc, operand));
                        ctx.state[top + FRAME_CPTR] = cptr;
                        ctx.state[top + FRAME_COUNT] -= 1;
                        if ctx.state[top + FRAME_COUNT] == 0 {
                            ctx.pop_frame();
                        }
                        continue 'restart;
                    }
                    ctx.pop_frame();
                }
                _ => {
                    let success = (frame_type == TYPE_LOOKAHEAD && ret)
                        || (frame_type == TYPE_NEGATIVE_LOOKAHEAD && !ret);
                    if success {
                        // A positive lookaround keeps the captures its body
                        // set; a negative one restores the snapshot.
                        if frame_type == TYPE_NEGATIVE_LOOKAHEAD {
                            ctx.restore_captures(capture);
                        }
                        stack_len = ctx.restore_stack(stack);
                        pc = ctx.state[top + FRAME_PC];
                        cptr = ctx.state[top + FRAME_CPTR];
                        ctx.pop_frame();
                        continue 'restart;
                    }
                    ret = false;
                    ctx.pop_frame();
                }
            }
        }
    }
}

fn offset_pc(pc: usize, disp: i32) -> usize {
    (pc as i64 + i64::from(disp)) as usize
}

/// Binary search over sorted, non-overlapping inclusive ranges.
fn range_search(c: u32, pairs: usize, lo: impl Fn(usize) -> u32, hi: impl Fn(usize) -> u32) -> bool {
    let mut min = 0usize;
    let mut max = pairs - 1;
    while min <= max {
        let mid = (min + max) / 2;
        if c < lo(mid) {
            if mid == 0 {
                return false;
            }
            max = mid - 1;
        } else if c > hi(mid) {
            min = mid + 1;
        } else {
            return true;
        }
    }
    false
}

/// Execute a compiled program against `input` starting at `start_index`
/// (counted in input units).
///
/// On a match, fills `captures` with unit offsets (2 entries per capture,
/// `None` for groups that did not participate) and returns `Ok(true)`.
/// `captures` must hold `2 * capture_count` entries.
///
/// # Panics
///
/// Panics when `captures` is too small, when `start_index` exceeds the
/// input length, or on corrupt bytecode.
pub fn exec<H: Host + ?Sized>(
    captures: &mut [Option<usize>],
    bc: &[u8],
    input: Input<'_>,
    start_index: usize,
    host: &mut H,
) -> Result<bool, ExecError> {
    let re_flags = bytecode::flags(bc);
    let capture_count = bytecode::capture_count(bc);
    let stack_size_max = bytecode::stack_size(bc);
    assert!(
        captures.len() >= 2 * capture_count,
        "capture array too small"
    );
    assert!(start_index <= input.len_units(), "start index out of range");

    let is_unicode = re_flags.contains(Flags::UNICODE);
    let mut ctx = ExecContext {
        host,
        capture_count,
        multiline: re_flags.contains(Flags::MULTILINE),
        ignore_case: re_flags.contains(Flags::IGNORECASE),
        is_unicode,
        interrupt_counter: INTERRUPT_COUNTER_INIT,
        frame_slots: FRAME_HEADER_SLOTS + 2 * capture_count + stack_size_max,
        state: Vec::new(),
    };

    let mut capture_buf = vec![NO_POSITION; 2 * capture_count];
    let mut stack_buf = vec![0usize; stack_size_max];
    let pc = header::LEN;

    let status = match input {
        Input::Latin1(bytes) => exec_backtrack(
            &mut ctx,
            &Latin1Buf(bytes),
            &mut capture_buf,
            &mut stack_buf,
            0,
            bc,
            pc,
            start_index,
            false,
        ),
        // Raw 16-bit buffers promote to UTF-16 traversal in Unicode mode.
        Input::Ucs2(units) if is_unicode => exec_backtrack(
            &mut ctx,
            &Utf16Buf(units),
            &mut capture_buf,
            &mut stack_buf,
            0,
            bc,
            pc,
            start_index,
            false,
        ),
        Input::Ucs2(units) => exec_backtrack(
            &mut ctx,
            &Ucs2Buf(units),
            &mut capture_buf,
            &mut stack_buf,
            0,
            bc,
            pc,
            start_index,
            false,
        ),
        Input::Utf16(units) if is_unicode => exec_backtrack(
            &mut ctx,
            &Utf16Buf(units),
            &mut capture_buf,
            &mut stack_buf,
            0,
            bc,
            pc,
            start_index,
            false,
        ),
        Input::Utf16(units) => exec_backtrack(
            &mut ctx,
            &Ucs2Buf(units),
            &mut capture_buf,
            &mut stack_buf,
            0,
            bc,
            pc,
            start_index,
            false,
        ),
        Input::Utf8(bytes) => exec_backtrack(
            &mut ctx,
            &Utf8Buf(bytes),
            &mut capture_buf,
            &mut stack_buf,
            0,
            bc,
            pc,
            start_index,
            false,
        ),
    }?;

    match status {
        Status::Matched => {
            for (slot, &value) in captures[..2 * capture_count]
                .iter_mut()
                .zip(capture_buf.iter())
            {
                *slot = (value != NO_POSITION).then_some(value);
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Execute and build a [`MatchReport`] on success.
pub fn run_match<H: Host + ?Sized>(
    bc: &[u8],
    input: Input<'_>,
    start_index: usize,
    host: &mut H,
) -> Result<Option<MatchReport>, ExecError> {
    let capture_count = bytecode::capture_count(bc);
    let mut captures = vec![None; 2 * capture_count];
    if !exec(&mut captures, bc, input, start_index, host)? {
        return Ok(None);
    }
    let spans = captures
        .chunks_exact(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(start), Some(end)) => Some(Span { start, end }),
            _ => None,
        })
        .collect();
    let group_names = bytecode::group_names(bc)
        .map(|names| names.map(|n| n.map(str::to_owned)).collect())
        .unwrap_or_default();
    Ok(Some(MatchReport {
        captures: spans,
        group_names,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_pattern;
    use crate::host::DefaultHost;
    use pretty_assertions::assert_eq;

    fn compile(pattern: &str, flags: Flags) -> Vec<u8> {
        compile_pattern(pattern.as_bytes(), flags, &DefaultHost).unwrap()
    }

    fn find(pattern: &str, flags: Flags, input: &str) -> Option<MatchReport> {
        let bc = compile(pattern, flags);
        run_match(&bc, Input::from(input), 0, &mut DefaultHost).unwrap()
    }

    fn span(start: usize, end: usize) -> Option<Span> {
        Some(Span { start, end })
    }

    #[test]
    fn test_basic_captures() {
        let report = find("a(b)c", Flags::empty(), "abc").unwrap();
        assert_eq!(report.captures, vec![span(0, 3), span(1, 2)]);
    }

    #[test]
    fn test_named_groups() {
        let report = find(
            "(?<year>\\d{4})-(?<m>\\d{2})",
            Flags::empty(),
            "2024-01-xx",
        )
        .unwrap();
        assert_eq!(report.captures[1], span(0, 4));
        assert_eq!(report.captures[2], span(5, 7));
        assert_eq!(report.named("year"), Some(Span { start: 0, end: 4 }));
        assert_eq!(report.named("m"), Some(Span { start: 5, end: 7 }));
        assert_eq!(report.named("day"), None);
    }

    #[test]
    fn test_lazy_quantifier_anchored_by_literal() {
        let report = find("a*?b", Flags::empty(), "aaab").unwrap();
        assert_eq!(report.captures[0], span(0, 4));
    }

    #[test]
    fn test_multiline_anchors() {
        let report = find("^foo$", Flags::MULTILINE, "foo\nbar").unwrap();
        assert_eq!(report.captures[0], span(0, 3));
        assert!(find("^foo$", Flags::empty(), "foo\nbar").is_none());
    }

    #[test]
    fn test_lookbehind() {
        let report = find("(?<=ab)c", Flags::empty(), "abc").unwrap();
        assert_eq!(report.captures[0], span(2, 3));
        assert!(find("(?<!ab)c", Flags::empty(), "abc").is_none());
        assert!(find("(?<!xb)c", Flags::empty(), "abc").unwrap().captures[0] == span(2, 3));
    }

    #[test]
    fn test_lookbehind_capture() {
        let report = find("(?<=(ab))c", Flags::empty(), "abc").unwrap();
        assert_eq!(report.captures[1], span(0, 2));
    }

    #[test]
    fn test_back_reference() {
        let report = find("(a)\\1", Flags::empty(), "aa").unwrap();
        assert_eq!(report.captures[0], span(0, 2));
        assert!(find("(a)\\1", Flags::empty(), "ab").is_none());
    }

    #[test]
    fn test_back_reference_unset_matches_empty() {
        // Group 1 never participates, so \1 consumes nothing.
        let report = find("(?:(a)|b)\\1c", Flags::empty(), "bc").unwrap();
        assert_eq!(report.captures[0], span(0, 2));
        assert_eq!(report.captures[1], None);
    }

    #[test]
    fn test_backward_back_reference_in_lookbehind() {
        // Inside a lookbehind the terms run right-to-left, so \1 is
        // evaluated while group 1 is still unset.
        let report = find("(?<=(a)\\1)b", Flags::empty(), "aab").unwrap();
        assert_eq!(report.captures[0], span(2, 3));
        assert_eq!(report.captures[1], span(1, 2));
        // A reference to a group captured before the lookbehind walks the
        // captured text end-to-start.
        let report = find("(a)(?<=\\1)b", Flags::empty(), "ab").unwrap();
        assert_eq!(report.captures[0], span(0, 2));
        assert_eq!(report.captures[1], span(0, 1));
    }

    #[test]
    fn test_utf16_astral_class() {
        let bc = compile("[\\u{1F600}-\\u{1F64F}]", Flags::UNICODE);
        // "a😃b" in UTF-16: 'a', surrogate pair, 'b'.
        let units: Vec<u16> = "a\u{1F603}b".encode_utf16().collect();
        assert_eq!(units.len(), 4);
        let mut captures = vec![None; 2];
        let matched = exec(
            &mut captures,
            &bc,
            Input::Utf16(&units),
            0,
            &mut DefaultHost,
        )
        .unwrap();
        assert!(matched);
        // One code point, two code units.
        assert_eq!(captures[0], Some(1));
        assert_eq!(captures[1], Some(3));
    }

    #[test]
    fn test_latin1_input() {
        let bc = compile("caf\\xe9", Flags::empty());
        let bytes = [b'c', b'a', b'f', 0xE9];
        let mut captures = vec![None; 2];
        let matched = exec(
            &mut captures,
            &bc,
            Input::Latin1(&bytes),
            0,
            &mut DefaultHost,
        )
        .unwrap();
        assert!(matched);
        assert_eq!(captures[1], Some(4));
    }

    #[test]
    fn test_ignore_case() {
        assert!(find("abc", Flags::IGNORECASE, "AbC").is_some());
        assert!(find("[a-z]+", Flags::IGNORECASE, "XYZ").is_some());
        assert!(find("abc", Flags::empty(), "AbC").is_none());
    }

    #[test]
    fn test_sticky_matches_only_at_start_index() {
        let bc = compile("bc", Flags::STICKY);
        let mut captures = vec![None; 2];
        let input = Input::from("abc");
        assert!(!exec(&mut captures, &bc, input, 0, &mut DefaultHost).unwrap());
        assert!(exec(&mut captures, &bc, input, 1, &mut DefaultHost).unwrap());
        assert_eq!(captures[0], Some(1));
        assert_eq!(captures[1], Some(3));

        // The non-sticky equivalent searches forward from the start.
        let bc = compile("bc", Flags::empty());
        assert!(exec(&mut captures, &bc, input, 0, &mut DefaultHost).unwrap());
        assert_eq!(captures[0], Some(1));
    }

    #[test]
    fn test_exec_is_idempotent() {
        let bc = compile("(a+)(b*)", Flags::empty());
        let first = run_match(&bc, Input::from("xaabb"), 0, &mut DefaultHost).unwrap();
        let second = run_match(&bc, Input::from("xaabb"), 0, &mut DefaultHost).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_word_boundaries() {
        let report = find("\\bcat\\b", Flags::empty(), "a cat sat").unwrap();
        assert_eq!(report.captures[0], span(2, 5));
        assert!(find("\\bcat\\b", Flags::empty(), "scatter").is_none());
        assert!(find("\\Bcat", Flags::empty(), "scatter").is_some());
    }

    #[test]
    fn test_alternation_order_is_leftmost() {
        let report = find("(ab|a)(b?)", Flags::empty(), "ab").unwrap();
        assert_eq!(report.captures[1], span(0, 2));
        assert_eq!(report.captures[2], span(2, 2));
    }

    #[test]
    fn test_greedy_quant_gives_back() {
        let report = find("a*ab", Flags::empty(), "aaab").unwrap();
        assert_eq!(report.captures[0], span(0, 4));
        let report = find("\\d+5", Flags::empty(), "12345").unwrap();
        assert_eq!(report.captures[0], span(0, 5));
    }

    #[test]
    fn test_counted_repetition() {
        assert!(find("a{2,3}", Flags::empty(), "aa").is_some());
        assert!(find("^a{2,3}$", Flags::STICKY, "aaa").is_some());
        assert!(find("^a{4,}$", Flags::empty(), "aaa").is_none());
        let report = find("(?:ab){2}", Flags::empty(), "ababab").unwrap();
        assert_eq!(report.captures[0], span(0, 4));
    }

    #[test]
    fn test_quantified_group_capture_reset() {
        // A skipped optional group leaves no stale capture.
        let report = find("(?:x(a))?y", Flags::empty(), "y").unwrap();
        assert_eq!(report.captures[0], span(0, 1));
        assert_eq!(report.captures[1], None);
        // Captures from earlier iterations of a loop survive.
        let report = find("(?:(a)|(b))*", Flags::empty(), "ab").unwrap();
        assert_eq!(report.captures[0], span(0, 2));
        assert_eq!(report.captures[1], span(0, 1));
        assert_eq!(report.captures[2], span(1, 2));
    }

    #[test]
    fn test_dotall() {
        assert!(find("a.b", Flags::empty(), "a\nb").is_none());
        assert!(find("a.b", Flags::DOTALL, "a\nb").is_some());
        assert!(find("a.b", Flags::empty(), "a\u{2028}b").is_none());
    }

    #[test]
    fn test_empty_pattern_and_empty_input() {
        let report = find("", Flags::empty(), "").unwrap();
        assert_eq!(report.captures[0], span(0, 0));
        let report = find("a*", Flags::empty(), "").unwrap();
        assert_eq!(report.captures[0], span(0, 0));
    }

    #[test]
    fn test_zero_width_loop_terminates() {
        // Without the advance guard this would loop forever.
        let report = find("(?:\\b)*x", Flags::empty(), "x").unwrap();
        assert_eq!(report.captures[0], span(0, 1));
        let report = find("()*y", Flags::empty(), "y").unwrap();
        assert_eq!(report.captures[0], span(0, 1));
    }

    /// Host that reports a timeout after a fixed number of polls.
    struct Deadline {
        polls_left: u32,
    }

    impl Host for Deadline {
        fn check_timeout(&mut self) -> bool {
            if self.polls_left == 0 {
                return true;
            }
            self.polls_left -= 1;
            false
        }
    }

    #[test]
    fn test_catastrophic_backtracking_times_out() {
        let bc = compile("(a+)+$", Flags::empty());
        let input = "aaaaaaaaaaaaaaaaaaaaaaaaaaaX";
        let mut captures = vec![None; 4];
        let mut host = Deadline { polls_left: 2 };
        let result = exec(&mut captures, &bc, Input::from(input), 0, &mut host);
        assert_eq!(result, Err(ExecError::Timeout));
    }

    #[test]
    fn test_catastrophic_backtracking_without_timeout_returns_no_match() {
        // Small enough to finish: the engine must not hang or crash.
        let bc = compile("(a+)+$", Flags::empty());
        let input = "aaaaaaaaaaaaaaaaX";
        let mut captures = vec![None; 4];
        let matched = exec(&mut captures, &bc, Input::from(input), 0, &mut DefaultHost).unwrap();
        assert!(!matched);
    }

    /// Host with a tiny backtrack-arena budget.
    struct TinyArena;

    impl Host for TinyArena {
        fn state_memory_limit(&self) -> usize {
            64
        }
    }

    #[test]
    fn test_state_memory_limit() {
        let bc = compile("(a|b)+c$", Flags::empty());
        let input = "abababababababababababab";
        let mut captures = vec![None; 4];
        let result = exec(&mut captures, &bc, Input::from(input), 0, &mut TinyArena);
        assert_eq!(result, Err(ExecError::MemoryLimit));
    }

    #[test]
    fn test_utf8_multibyte_positions_are_byte_offsets() {
        let report = find("é(b)", Flags::empty(), "aéb").unwrap();
        // 'a' is 1 byte, 'é' is 2 bytes.
        assert_eq!(report.captures[0], span(1, 4));
        assert_eq!(report.captures[1], span(3, 4));
    }
}
