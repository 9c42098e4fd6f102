use clap::{arg, crate_version, Command};
use ppmcodec::archive;
use ppmcodec::context_tree::{CodingParams, UpCharCoding};
use std::io::{Read, Write};

const RCH: &str = "unreachable was reached";

fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path)
    }
}

fn write_output(path: &str, data: &[u8]) -> std::io::Result<()> {
    if path == "-" {
        std::io::stdout().write_all(data)
    } else {
        std::fs::write(path, data)
    }
}

fn parse_bool_flag(s: &str) -> Result<bool, String> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(format!("expected 0 or 1, got {other}")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help = "Examples:
---------
Compress:   `ppmcodec zip -i my_plain.txt -o my_archive.ppm`
Expand:     `ppmcodec unzip -i my_archive.ppm -o my_plain.txt`
Use `-` for either path to read/write stdin/stdout.";

    let mut main_cmd =
        Command::new("ppmcodec").about("Adaptive PPM text compression").after_long_help(long_help).version(crate_version!());

    main_cmd = main_cmd.subcommand(
        Command::new("zip")
            .arg(arg!(<SRC> "source path, or - for stdin"))
            .arg(arg!(<DST> "destination path, or - for stdout"))
            .arg(arg!(-K --context <N> "context order").default_value("5"))
            .arg(arg!(-m --mask <FLAG> "mask already-seen symbols while escaping (0|1)").default_value("0"))
            .arg(arg!(-e --exclude <FLAG> "stop the update walk at the coding node (0|1)").default_value("0"))
            .arg(arg!(-u --up <SCHEME> "novel-symbol weighting scheme").value_parser(["A", "B", "C", "D"]).default_value("A"))
            .arg(arg!(-c --capitalize <FLAG> "normalize capitalization before coding (0|1)").default_value("0"))
            .about("compress a file"),
    );

    main_cmd = main_cmd.subcommand(
        Command::new("unzip")
            .arg(arg!(<SRC> "source path, or - for stdin"))
            .arg(arg!(<DST> "destination path, or - for stdout"))
            .about("expand a file"),
    );

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("zip") {
        let src = cmd.get_one::<String>("SRC").expect(RCH);
        let dst = cmd.get_one::<String>("DST").expect(RCH);
        let context_length: u8 = cmd.get_one::<String>("context").expect(RCH).parse()?;
        let mask_seen = parse_bool_flag(cmd.get_one::<String>("mask").expect(RCH))?;
        let exclude_on_update = parse_bool_flag(cmd.get_one::<String>("exclude").expect(RCH))?;
        let decapitalize = parse_bool_flag(cmd.get_one::<String>("capitalize").expect(RCH))?;
        let up_char_coding = match cmd.get_one::<String>("up").expect(RCH).as_str() {
            "A" => UpCharCoding::A,
            "B" => UpCharCoding::B,
            "C" => UpCharCoding::C,
            "D" => UpCharCoding::D,
            _ => unreachable!("{}", RCH),
        };
        let params = CodingParams { context_length, mask_seen, exclude_on_update, up_char_coding, decapitalize };

        log::info!("reading {src}");
        let input = read_input(src)?;
        let archived = archive::compress(&input, params)?;
        log::info!("writing {} archived bytes to {dst}", archived.len());
        write_output(dst, &archived)?;
    }

    if let Some(cmd) = matches.subcommand_matches("unzip") {
        let src = cmd.get_one::<String>("SRC").expect(RCH);
        let dst = cmd.get_one::<String>("DST").expect(RCH);

        log::info!("reading {src}");
        let input = read_input(src)?;
        let restored = archive::expand(&input)?;
        log::info!("writing {} restored bytes to {dst}", restored.len());
        write_output(dst, &restored)?;
    }

    Ok(())
}
