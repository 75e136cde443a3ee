//! 脚本命令：每行一条，`#` 开头的行是注释。
//!
//! ```text
//! mkdir /a
//! open /a/f RDWR|CREAT rw-
//! write 0 10110
//! read 0
//! ```

use std::str::FromStr;

use enumflags2::BitFlags;
use vsfs::{bits, BlockId, OpenFlag, Permission, Vsfs};

use crate::ShellError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir(String),
    Rmdir(String),
    Unlink(String),
    Ls(String),
    Open {
        path: String,
        flags: BitFlags<OpenFlag>,
        mode: Option<BitFlags<Permission>>,
    },
    Close(usize),
    Write { fd: usize, bits: String },
    Read(usize),
    Stat(String),
    Bitmap,
    Block(usize),
    Usage,
}

impl FromStr for Command {
    type Err = ShellError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ShellError::Parse("empty command".to_owned()));
        };
        let args: Vec<&str> = words.collect();

        let command = match (name, &args[..]) {
            ("mkdir", [path]) => Self::Mkdir((*path).to_owned()),
            ("rmdir", [path]) => Self::Rmdir((*path).to_owned()),
            ("unlink", [path]) => Self::Unlink((*path).to_owned()),
            ("ls", []) => Self::Ls("/".to_owned()),
            ("ls", [path]) => Self::Ls((*path).to_owned()),
            ("open", [path, flags, mode @ ..]) if mode.len() <= 1 => Self::Open {
                path: (*path).to_owned(),
                flags: parse_flags(flags)?,
                mode: mode.first().map(|mode| parse_mode(mode)).transpose()?,
            },
            ("close", [fd]) => Self::Close(parse_number(fd)?),
            ("write", [fd]) => Self::Write {
                fd: parse_number(fd)?,
                bits: String::new(),
            },
            ("write", [fd, data]) => Self::Write {
                fd: parse_number(fd)?,
                bits: (*data).to_owned(),
            },
            ("read", [fd]) => Self::Read(parse_number(fd)?),
            ("stat", [path]) => Self::Stat((*path).to_owned()),
            ("bitmap", []) => Self::Bitmap,
            ("block", [block]) => Self::Block(parse_number(block)?),
            ("usage", []) => Self::Usage,
            _ => return Err(ShellError::Parse(format!("cannot parse {line:?}"))),
        };

        Ok(command)
    }
}

/// `RDWR|CREAT` 之类，不区分大小写
fn parse_flags(text: &str) -> Result<BitFlags<OpenFlag>, ShellError> {
    text.split('|')
        .map(|flag| match flag.to_ascii_uppercase().as_str() {
            "RDONLY" => Ok(OpenFlag::RDONLY),
            "WRONLY" => Ok(OpenFlag::WRONLY),
            "RDWR" => Ok(OpenFlag::RDWR),
            "CREAT" => Ok(OpenFlag::CREAT),
            _ => Err(ShellError::Parse(format!("unknown open flag {flag:?}"))),
        })
        .collect()
}

/// `rwx` 形式或一位八进制数
fn parse_mode(text: &str) -> Result<BitFlags<Permission>, ShellError> {
    if let Ok(octal) = u8::from_str_radix(text, 8) {
        return BitFlags::from_bits(octal)
            .map_err(|_| ShellError::Parse(format!("mode {text:?} out of range")));
    }

    let bits: Vec<char> = text.chars().collect();
    let &[r, w, x] = &bits[..] else {
        return Err(ShellError::Parse(format!("bad mode {text:?}")));
    };

    let mut mode = BitFlags::empty();
    for (c, expected, permission) in [
        (r, 'r', Permission::Read),
        (w, 'w', Permission::Write),
        (x, 'x', Permission::Execute),
    ] {
        match c {
            '-' => (),
            c if c == expected => mode |= permission,
            _ => return Err(ShellError::Parse(format!("bad mode {text:?}"))),
        }
    }
    Ok(mode)
}

fn parse_number(text: &str) -> Result<usize, ShellError> {
    text.parse()
        .map_err(|_| ShellError::Parse(format!("{text:?} is not a number")))
}

fn mode_string(mode: BitFlags<Permission>) -> String {
    [
        (Permission::Read, 'r'),
        (Permission::Write, 'w'),
        (Permission::Execute, 'x'),
    ]
    .into_iter()
    .map(|(permission, c)| if mode.contains(permission) { c } else { '-' })
    .collect()
}

/// 执行一条命令，返回要打印的内容，每行以换行结尾
pub async fn execute(fs: &Vsfs, command: &Command) -> vsfs::Result<String> {
    let lines = match command {
        Command::Mkdir(path) => {
            fs.mkdir(path).await?;
            Vec::new()
        }
        Command::Rmdir(path) => {
            fs.rmdir(path).await?;
            Vec::new()
        }
        Command::Unlink(path) => {
            fs.unlink(path).await?;
            Vec::new()
        }
        Command::Ls(path) => fs
            .listing(path)
            .await?
            .iter()
            .map(|entry| format!("{:<13} {}", entry.name(), entry.inode_id()))
            .collect(),
        Command::Open { path, flags, mode } => {
            vec![format!("fd {}", fs.open(path, *flags, *mode).await?)]
        }
        Command::Close(fd) => {
            fs.close(*fd)?;
            Vec::new()
        }
        Command::Write { fd, bits } => {
            fs.write(*fd, bits).await?;
            Vec::new()
        }
        Command::Read(fd) => vec![bits::unpack(&fs.read(*fd).await?)],
        Command::Stat(path) => {
            let stat = fs.stat(path).await?;
            let blocks: Vec<String> = stat.blocks.iter().map(ToString::to_string).collect();
            vec![format!(
                "inode {} {:?} {} size {} created {} modified {} blocks [{}]",
                stat.inode,
                stat.kind,
                mode_string(stat.permissions),
                stat.size,
                stat.created,
                stat.modified,
                blocks.join(", "),
            )]
        }
        Command::Bitmap => vec![
            format!("inodes {}", fs.inode_bitmap().await?),
            format!("data   {}", fs.data_bitmap().await?),
        ],
        Command::Block(block) => fs
            .dump_block(BlockId::new(*block))
            .await?
            .as_bytes()
            .chunks(16)
            .map(bits::unpack)
            .collect(),
        Command::Usage => {
            let usage = fs.usage().await?;
            vec![format!(
                "inodes {}/{}, data blocks {}/{}",
                usage.inodes_used, usage.inodes_total, usage.data_used, usage.data_total
            )]
        }
    };

    Ok(lines.into_iter().map(|line| line + "\n").collect())
}
