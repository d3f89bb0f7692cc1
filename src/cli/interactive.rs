//! Configuração interativa do kcache.
//!
//! Este módulo implementa a configuração interativa usando dialoguer.

use std::path::Path;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::types::config::{AgingPolicyKind, Config};
use crate::KcacheResult;

/// Executa a configuração interativa.
pub fn run_interactive_config(config_path: &Path) -> KcacheResult<()> {
    let theme = ColorfulTheme::default();

    println!("\n🔧 Configuração Interativa do kcache\n");

    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        println!("Criando nova configuração...\n");
        Config::default_config()
    };

    loop {
        let options = vec![
            "Configurações Gerais",
            "Política de Cache",
            "Tabela de Ocorrências",
            "Replay",
            "Salvar e Sair",
            "Sair sem Salvar",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("O que deseja configurar?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => configure_general(&theme, &mut config)?,
            1 => configure_cache(&theme, &mut config)?,
            2 => configure_occurrence(&theme, &mut config)?,
            3 => configure_replay(&theme, &mut config)?,
            4 => {
                if let Err(e) = config.validate() {
                    println!("\n✗ Configuração inválida: {}\n", e);
                    continue;
                }
                config.save(config_path)?;
                println!("\n✓ Configuração salva em: {}\n", config_path.display());
                break;
            }
            5 => {
                if Confirm::with_theme(&theme)
                    .with_prompt("Deseja realmente sair sem salvar?")
                    .default(false)
                    .interact()?
                {
                    println!("\nSaindo sem salvar.\n");
                    break;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Configura opções gerais.
fn configure_general(theme: &ColorfulTheme, config: &mut Config) -> KcacheResult<()> {
    println!("\n📋 Configurações Gerais\n");

    let log_levels = vec!["error", "warn", "info", "debug", "trace"];
    let current_idx = log_levels
        .iter()
        .position(|&l| l == config.general.log_level)
        .unwrap_or(2);

    let log_level_idx = Select::with_theme(theme)
        .with_prompt("Nível de log")
        .items(&log_levels)
        .default(current_idx)
        .interact()?;

    config.general.log_level = log_levels[log_level_idx].to_string();

    let log_formats = vec!["text", "json"];
    let current_format_idx = log_formats
        .iter()
        .position(|&f| f == config.general.log_format)
        .unwrap_or(0);

    let log_format_idx = Select::with_theme(theme)
        .with_prompt("Formato de log")
        .items(&log_formats)
        .default(current_format_idx)
        .interact()?;

    config.general.log_format = log_formats[log_format_idx].to_string();

    println!("\n✓ Configurações gerais atualizadas.\n");
    Ok(())
}

/// Configura capacidade, K e política de aging.
fn configure_cache(theme: &ColorfulTheme, config: &mut Config) -> KcacheResult<()> {
    println!("\n💾 Política de Cache\n");

    let policies = vec![
        "LRU-K (admite após K ocorrências)",
        "LRU (admite sempre)",
    ];

    let current_idx = match config.cache.aging_policy {
        AgingPolicyKind::LruK => 0,
        AgingPolicyKind::Lru => 1,
    };

    let policy_idx = Select::with_theme(theme)
        .with_prompt("Política de aging")
        .items(&policies)
        .default(current_idx)
        .interact()?;

    config.cache.aging_policy = match policy_idx {
        0 => AgingPolicyKind::LruK,
        _ => AgingPolicyKind::Lru,
    };

    let capacity: usize = Input::with_theme(theme)
        .with_prompt("Capacidade máxima (número de entradas)")
        .default(config.cache.capacity)
        .validate_with(|v: &usize| if *v >= 1 { Ok(()) } else { Err("deve ser >= 1") })
        .interact_text()?;

    config.cache.capacity = capacity;

    if config.cache.aging_policy == AgingPolicyKind::LruK {
        let k_times: u32 = Input::with_theme(theme)
            .with_prompt("K (ocorrências antes de admitir)")
            .default(config.cache.k_times)
            .validate_with(|v: &u32| if *v >= 1 { Ok(()) } else { Err("deve ser >= 1") })
            .interact_text()?;

        config.cache.k_times = k_times;
    }

    println!("\n✓ Política de cache configurada.\n");
    Ok(())
}

/// Configura a tabela de ocorrências do LRU-K.
fn configure_occurrence(theme: &ColorfulTheme, config: &mut Config) -> KcacheResult<()> {
    println!("\n🔢 Tabela de Ocorrências\n");

    let bounded = Confirm::with_theme(theme)
        .with_prompt("Limitar o número de hashes rastreados?")
        .default(config.cache.occurrence.max_tracked_hashes.is_some())
        .interact()?;

    config.cache.occurrence.max_tracked_hashes = if bounded {
        let max: usize = Input::with_theme(theme)
            .with_prompt("Máximo de hashes rastreados")
            .default(config.cache.occurrence.max_tracked_hashes.unwrap_or(10_000))
            .validate_with(|v: &usize| if *v >= 1 { Ok(()) } else { Err("deve ser >= 1") })
            .interact_text()?;
        Some(max)
    } else {
        None
    };

    config.cache.occurrence.reset_on_evict = Confirm::with_theme(theme)
        .with_prompt("Zerar a contagem quando a entrada for removida?")
        .default(config.cache.occurrence.reset_on_evict)
        .interact()?;

    println!("\n✓ Tabela de ocorrências configurada.\n");
    Ok(())
}

/// Configura o replay de traces.
fn configure_replay(theme: &ColorfulTheme, config: &mut Config) -> KcacheResult<()> {
    println!("\n▶ Replay\n");

    let threads: usize = Input::with_theme(theme)
        .with_prompt("Número de workers")
        .default(config.replay.threads)
        .validate_with(|v: &usize| if *v >= 1 { Ok(()) } else { Err("deve ser >= 1") })
        .interact_text()?;

    config.replay.threads = threads;

    config.replay.show_progress = Confirm::with_theme(theme)
        .with_prompt("Mostrar barra de progresso?")
        .default(config.replay.show_progress)
        .interact()?;

    println!("\n✓ Replay configurado.\n");
    Ok(())
}

/// Mostra resumo da configuração.
pub fn show_config_summary(config: &Config) {
    println!("\n📊 Resumo da Configuração\n");
    println!("┌─────────────────────────────────────────┐");
    println!("│ Geral                                   │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Log level: {:<28} │", config.general.log_level);
    println!("│ Log format: {:<27} │", config.general.log_format);
    println!("├─────────────────────────────────────────┤");
    println!("│ Cache                                   │");
    println!("├─────────────────────────────────────────┤");
    println!(
        "│ Aging: {:<32} │",
        format!("{:?}", config.cache.aging_policy)
    );
    println!(
        "│ Match: {:<32} │",
        format!("{:?}", config.cache.match_policy)
    );
    println!("│ Capacidade: {:<27} │", config.cache.capacity);
    println!("│ K: {:<36} │", config.cache.k_times);
    println!(
        "│ Hashes rastreados: {:<20} │",
        config
            .cache
            .occurrence
            .max_tracked_hashes
            .map(|max| max.to_string())
            .unwrap_or_else(|| "sem limite".to_string())
    );
    println!(
        "│ Zerar na evicção: {:<21} │",
        if config.cache.occurrence.reset_on_evict {
            "Sim"
        } else {
            "Não"
        }
    );
    println!("├─────────────────────────────────────────┤");
    println!("│ Replay                                  │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Workers: {:<30} │", config.replay.threads);
    println!(
        "│ Progresso: {:<28} │",
        if config.replay.show_progress {
            "Sim"
        } else {
            "Não"
        }
    );
    println!("└─────────────────────────────────────────┘");
    println!();
}
