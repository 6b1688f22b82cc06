//! Simple command client test
//!
//! Connects to the simulator, sends every line typed on stdin as a command frame and prints the
//! size of the image frames sent back.

use std::{
    io::{BufRead, Read},
    net::TcpStream,
    thread,
};
use byteorder::{LittleEndian, ReadBytesExt};
use structopt::StructOpt;

use comms_if::{net::frame::write_frame, tc::Command};

#[derive(Debug, StructOpt)]
#[structopt(name = "test_cmd_client")]
struct Opts {
    /// Address of the simulator's command server
    #[structopt(default_value = "127.0.0.1:2737")]
    endpoint: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::from_args();

    let stream = match TcpStream::connect(&opts.endpoint) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not connect to the server");
            return Err(e.into())
        }
    };
    println!("Connected to {}", opts.endpoint);

    // Print the images as they arrive
    let mut img_stream = stream.try_clone()?;
    thread::spawn(move || {
        let mut num_frames = 0u64;
        loop {
            let len = match img_stream.read_u32::<LittleEndian>() {
                Ok(l) => l as usize,
                Err(e) => {
                    println!("Image stream closed: {}", e);
                    break
                }
            };

            let mut data = vec![0u8; len];
            if let Err(e) = img_stream.read_exact(&mut data) {
                println!("Image stream closed mid-frame: {}", e);
                break
            }

            num_frames += 1;
            if num_frames % 10 == 0 {
                println!("Received {} images, last was {} bytes", num_frames, len);
            }
        }
    });

    // Send each line as a command
    let mut writer = &stream;
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let text = line.trim();

        if text.is_empty() {
            continue;
        }

        // Warn about bad commands but send them anyway, the server must cope with them
        if let Err(e) = Command::parse(text) {
            println!("Warning: \"{}\" will be rejected by the server: {}", text, e);
        }

        write_frame(&mut writer, text.as_bytes())?;
        println!("Sent \"{}\"", text);
    }

    Ok(())
}
