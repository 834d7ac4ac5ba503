use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use emu_m6502::{Machine, RunSettings, RunSummary};

/// 6502 assembler and emulator front end.
#[derive(Parser)]
struct Args {
    /// Assemble this source file to machine code (see --output)
    #[arg(short = 't', long, value_name = "FILE")]
    translate: Option<PathBuf>,

    /// Assemble and run this source file
    #[arg(short = 'r', long, value_name = "FILE")]
    run: Option<PathBuf>,

    /// Run this raw machine-code image
    #[arg(long, value_name = "FILE")]
    bin: Option<PathBuf>,

    /// Output path for the assembled binary
    #[arg(short = 'o', long, default_value = "a.out")]
    output: PathBuf,

    /// Stop once the program counter passes the last loaded instruction
    #[arg(short = 's', long, default_value_t = false)]
    stop: bool,

    /// Load address ($ or 0x hex prefixes accepted)
    #[arg(long, value_parser = parse_addr, default_value = "0x0600")]
    load_addr: u16,

    /// Abort the run after this many instructions
    #[arg(long, value_name = "COUNT")]
    step_limit: Option<u64>,

    /// Reject memory accesses below this address
    #[arg(long, value_parser = parse_addr, value_name = "ADDR")]
    reserved_base: Option<u16>,

    /// Print final CPU registers
    #[arg(long, default_value_t = false)]
    dump_cpu: bool,

    /// Dump a memory range after the run, e.g. 0x0000..0x0010
    #[arg(long, value_name = "START..END")]
    dump_mem: Option<String>,

    /// Print the final machine state as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_addr(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let (digits, radix) = if let Some(hex) = text.strip_prefix('$') {
        (hex, 16)
    } else if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else {
        (text, 10)
    };
    u16::from_str_radix(digits, radix).map_err(|e| format!("invalid address {text:?}: {e}"))
}

fn parse_range(text: &str) -> Result<(u16, u16)> {
    let (start, end) = text
        .split_once("..")
        .with_context(|| format!("range {text:?} must look like START..END"))?;
    let start = parse_addr(start).map_err(|e| anyhow::anyhow!(e))?;
    let end = parse_addr(end).map_err(|e| anyhow::anyhow!(e))?;
    if start > end {
        bail!("range start {start:#06x} is above its end {end:#06x}");
    }
    Ok((start, end))
}

fn assemble_file(path: &Path, load_addr: u16) -> Result<emu_asm::Program> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    emu_asm::assemble(&source, load_addr)
        .with_context(|| format!("could not assemble {}", path.display()))
}

fn print_registers(summary: &RunSummary) {
    let regs = &summary.registers;
    println!("A: {:02x}\tX: {:02x}\tY: {:02x}", regs.a, regs.x, regs.y);
    println!(
        "S: {:02x}\tP: {:02x}\tPC: {:04x}",
        regs.sp, regs.status, regs.pc
    );
}

fn print_memory(bytes: &[u8], start: u16) {
    const COLS: usize = 8;
    for (row, chunk) in bytes.chunks(COLS).enumerate() {
        let addr = start as usize + row * COLS;
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{addr:04x}: {}", line.join(" "));
    }
}

fn run_machine(args: &Args, image: &[u8]) -> Result<()> {
    let settings = RunSettings {
        load_addr: args.load_addr,
        stop_on_end: args.stop,
        step_limit: args.step_limit,
        reserved_base: args.reserved_base,
        ..RunSettings::default()
    };
    let mut machine = Machine::new(settings)?;
    machine.load_program(image)?;

    let summary = machine.run()?;
    log::info!(
        "run finished: {:?} after {} cycles",
        summary.reason,
        summary.cycles
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if args.dump_cpu {
        print_registers(&summary);
    }
    if let Some(range) = &args.dump_mem {
        let (start, end) = parse_range(range)?;
        let bytes = machine.memory_range(start, end)?;
        print_memory(&bytes, start);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(source) = &args.translate {
        let program = assemble_file(source, args.load_addr)?;
        fs::write(&args.output, &program.bytes)
            .with_context(|| format!("could not write {}", args.output.display()))?;
        println!(
            "wrote {} bytes to {}",
            program.bytes.len(),
            args.output.display()
        );
        return Ok(());
    }

    if let Some(source) = &args.run {
        let program = assemble_file(source, args.load_addr)?;
        return run_machine(&args, &program.bytes);
    }

    if let Some(image) = &args.bin {
        let bytes =
            fs::read(image).with_context(|| format!("could not read {}", image.display()))?;
        return run_machine(&args, &bytes);
    }

    bail!("nothing to do: pass one of -t, -r, or --bin (see --help)");
}
