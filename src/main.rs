use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use emu8005::console::StreamConsole;
use emu8005::input::KeyboardInput;
use emu8005::sound::{SimpleBeep, Sound, TerminalBell};
use emu8005::{compile, parse_words, Interpreter, Outcome};

/// Run a program on a chip described by an instruction-set file
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// location of instruction file
    #[arg(short, long, default_value = "8005instr.txt")]
    instruction_set: PathBuf,

    /// location of program file to run
    #[arg(short, long, default_value = "program.txt")]
    file: PathBuf,

    /// more diagnostics: -v info, -vv debug, -vvv per-step trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// give up after this many fetch cycles
    #[arg(long)]
    max_steps: Option<u64>,

    /// run at roughly this many fetch cycles per second
    #[arg(long)]
    clock_hz: Option<f64>,

    /// ring BELL on the PC speaker instead of the terminal
    #[arg(long)]
    beep: bool,

    /// single-step, one keypress per fetch cycle: space, enter or s steps,
    /// c continues to the end, q or esc quits
    #[arg(short, long)]
    step: bool,

    /// print the compiled instruction table and exit
    #[arg(long)]
    list: bool,

    /// print registers and memory when the run ends
    #[arg(long)]
    dump: bool,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::new().with_level(level(args.verbose)).init()?;

    // compile the chip
    let source = fs::read_to_string(&args.instruction_set)?;
    let chip = compile(&source)?;
    if args.list {
        print!("{}", chip);
        return Ok(());
    }

    // load a program
    let program = parse_words(&fs::read_to_string(&args.file)?)?;
    log::info!("loaded {} words from {}", program.len(), args.file.display());

    let mut console = StreamConsole::stdout();
    let mut sound: Box<dyn Sound> = if args.beep {
        Box::new(SimpleBeep::new())
    } else {
        Box::new(TerminalBell::stderr())
    };
    let mut interpreter = Interpreter::new(&chip, &mut console, sound.as_mut());
    if let Some(limit) = args.max_steps {
        interpreter = interpreter.with_step_limit(limit);
    }
    if let Some(hz) = args.clock_hz {
        interpreter = interpreter.with_clock(hz);
    }

    let summary = if args.step {
        interpreter.execute_stepping(program, &mut KeyboardInput::new())?
    } else {
        interpreter.execute(program)?
    };
    if summary.outcome == Outcome::Aborted {
        log::warn!("run abandoned at address {}", summary.context.pointer());
    }

    if args.dump {
        let ctx = &summary.context;
        println!("--- MACHINE STATE ---");
        println!("IP: {} Steps: {} ({:?})", ctx.pointer(), ctx.steps(), summary.outcome);
        println!("{}", ctx.registers());
        print!("{}", ctx.memory());
        println!("---------------------");
    }
    Ok(())
}
